use serde::Deserialize;

use crate::error::FieldErrors;
use crate::validation;

/// Request body for user registration. Every field is required; they are
/// optional here so a missing one shows up in the error map.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    #[serde(default, deserialize_with = "validation::string_or_number")]
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// Registration input that passed validation; password still in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub phone_number: String,
    pub email: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<ValidRegistration, FieldErrors> {
        let mut errors = FieldErrors::default();
        let first_name =
            validation::required(&mut errors, "first_name", self.first_name.as_deref(), 150);
        let last_name =
            validation::required(&mut errors, "last_name", self.last_name.as_deref(), 150);
        let password = match self.password.as_deref() {
            None => {
                errors.add("password", validation::REQUIRED);
                None
            }
            Some(p) if p.is_empty() => {
                errors.add("password", validation::BLANK);
                None
            }
            Some(p) => Some(p.to_string()),
        };
        let phone_number = validation::phone(&mut errors, self.phone_number.as_deref(), true);
        let email = validation::email(&mut errors, self.email.as_deref(), true);

        match (first_name, last_name, password, phone_number, email) {
            (Some(first_name), Some(last_name), Some(password), Some(phone_number), Some(email))
                if errors.is_empty() =>
            {
                Ok(ValidRegistration {
                    first_name,
                    last_name,
                    password,
                    phone_number,
                    email,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Forgot-password step one.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: Option<String>,
}

/// Forgot-password step two.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    #[serde(default, deserialize_with = "validation::string_or_number")]
    pub otp: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReset {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<ValidReset, FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = validation::email(&mut errors, self.email.as_deref(), true);
        let otp = validation::required(&mut errors, "otp", self.otp.as_deref(), 8);
        let new_password = match self.new_password.as_deref() {
            Some(p) if !p.is_empty() => Some(p.to_string()),
            Some(_) => {
                errors.add("new_password", validation::BLANK);
                None
            }
            None => {
                errors.add("new_password", validation::REQUIRED);
                None
            }
        };
        match (email, otp, new_password) {
            (Some(email), Some(otp), Some(new_password)) => errors.into_result(ValidReset {
                email,
                otp,
                new_password,
            }),
            _ => Err(errors),
        }
    }
}
