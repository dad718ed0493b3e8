use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{3,15}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reads an optional text field that clients may also send as a JSON number,
/// such as a phone number or a one-time code.
pub fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(de)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    }))
}

fn too_long(max_len: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max_len)
}

/// Checks a supplied value: not blank, within `max_len`. Returns the trimmed value.
pub fn present(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    max_len: usize,
) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > max_len {
        errors.add(field, too_long(max_len));
        return None;
    }
    Some(value.to_string())
}

/// Like [`present`], but a missing value is an error too.
pub fn required(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Option<String> {
    match value {
        Some(v) => present(errors, field, v, max_len),
        None => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

pub fn email(errors: &mut FieldErrors, value: Option<&str>, mandatory: bool) -> Option<String> {
    let raw = match value {
        Some(v) => v,
        None if mandatory => {
            errors.add("email", REQUIRED);
            return None;
        }
        None => return None,
    };
    let email = present(errors, "email", &normalize_email(raw), 254)?;
    if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
        return None;
    }
    Some(email)
}

pub fn phone(errors: &mut FieldErrors, value: Option<&str>, mandatory: bool) -> Option<String> {
    let raw = match value {
        Some(v) => v,
        None if mandatory => {
            errors.add("phone_number", REQUIRED);
            return None;
        }
        None => return None,
    };
    let phone = present(errors, "phone_number", raw, 16)?;
    if !is_valid_phone(&phone) {
        errors.add("phone_number", "Enter a valid phone number.");
        return None;
    }
    Some(phone)
}
