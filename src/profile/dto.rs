use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo_types::{Gender, ProfileChanges, User};
use crate::error::{ApiError, FieldErrors};
use crate::topics::repo_types::LearningTopic;
use crate::validation;

/// Serialized user as returned by the profile endpoints.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>, // presigned URL
    pub gender: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProfileResponse {
    pub fn new(user: User, profile_image: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone_number: user.phone_number,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image,
            gender: user.gender,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub message: String,
    pub user: ProfileResponse,
}

#[derive(Debug, Serialize)]
pub struct OnboardingSaved {
    pub message: String,
    pub topics: Vec<LearningTopic>,
}

/// PATCH body. Absent fields stay as they are; the password cannot be changed here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "validation::string_or_number")]
    pub phone_number: Option<String>,
    pub gender: Option<String>,
}

pub(crate) fn invalid_choice(raw: &str) -> String {
    format!("\"{}\" is not a valid choice.", raw)
}

pub(crate) fn parse_gender(errors: &mut FieldErrors, raw: Option<&str>) -> Option<Gender> {
    let raw = raw?;
    let gender = Gender::parse(raw);
    if gender.is_none() {
        errors.add("gender", invalid_choice(raw));
    }
    gender
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<ProfileChanges, FieldErrors> {
        let mut errors = FieldErrors::default();
        let first_name = self
            .first_name
            .as_deref()
            .and_then(|v| validation::present(&mut errors, "first_name", v, 150));
        let last_name = self
            .last_name
            .as_deref()
            .and_then(|v| validation::present(&mut errors, "last_name", v, 150));
        let email = validation::email(&mut errors, self.email.as_deref(), false);
        let phone_number = validation::phone(&mut errors, self.phone_number.as_deref(), false);
        let gender = parse_gender(&mut errors, self.gender.as_deref());

        errors.into_result(ProfileChanges {
            first_name,
            last_name,
            email,
            phone_number,
            profile_image: None,
            gender,
        })
    }
}

/// `topics` form field: a JSON array of labels, kept in order, duplicates included.
pub fn parse_topics(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let invalid = || ApiError::bad_request("Topics must be a list");
    let value: Value = serde_json::from_str(raw.ok_or_else(invalid)?).map_err(|_| invalid())?;
    let Value::Array(items) = value else {
        return Err(invalid());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(invalid()),
        })
        .collect()
}
