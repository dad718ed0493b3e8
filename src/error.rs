use std::collections::BTreeMap;

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

/// Field name -> list of problems, rendered under `errors`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Store write failures that callers need to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} is already in use")]
    Conflict(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some("users_phone_number_key") => "phone_number",
                    _ => "email",
                };
                return RepoError::Conflict(field);
            }
        }
        RepoError::Other(e.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}: {error}")]
    NotFound { message: String, error: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(errors: FieldErrors) -> Self {
        ApiError::Validation {
            message: "Please check the entered details".into(),
            errors,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn user_missing() -> Self {
        ApiError::NotFound {
            message: "User does not exist".into(),
            error: "User data not found".into(),
        }
    }

    pub fn cannot_complete(error: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: "Cannot complete the request".into(),
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict("phone_number") => {
                ApiError::bad_request("An account already exists with this phone number")
            }
            RepoError::Conflict(_) => {
                ApiError::bad_request("An account already exists with this email id")
            }
            RepoError::Other(e) => ApiError::Internal(e),
        }
    }
}

/// Body-level problems that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

fn unreadable_body(detail: String) -> ApiError {
    warn!(detail = %detail, "request body rejected");
    let mut errors = FieldErrors::default();
    errors.add(NON_FIELD_ERRORS, detail);
    ApiError::validation(errors)
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        unreadable_body(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        unreadable_body(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation { message, errors } => json!({ "message": message, "errors": errors }),
            ApiError::BadRequest(message) | ApiError::Unauthorized(message) => {
                json!({ "message": message })
            }
            ApiError::NotFound { message, error } => json!({ "message": message, "error": error }),
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                json!({ "message": "Something went wrong" })
            }
        };
        (status, Json(body)).into_response()
    }
}
