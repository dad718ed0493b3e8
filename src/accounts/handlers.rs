use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        dto::{OtpRequest, RegisterRequest, ResetPasswordRequest},
        repo_types::NewUser,
        services::{check_otp, generate_otp, OtpCheck},
    },
    auth::services::hash_password,
    error::{ApiError, FieldErrors},
    extract::JsonBody,
    response::Message,
    state::AppState,
    validation,
};

const DUPLICATE_EMAIL: &str = "An account already exists with this email id";
const DUPLICATE_PHONE: &str = "An account already exists with this phone number";
const INVALID_OTP: &str = "Invalid OTP";
const TOO_MANY_ATTEMPTS: &str = "Too many invalid attempts. Request a new OTP.";

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/create/account", post(register))
        .route("/forgot-password/request-otp", post(request_otp))
        .route("/forgot-password/confirm", post(confirm_reset))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    // Duplicates are reported before the schema check.
    if let Some(email) = payload.email.as_deref().map(validation::normalize_email) {
        if !email.is_empty() && state.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(ApiError::bad_request(DUPLICATE_EMAIL));
        }
    }
    if let Some(phone) = payload.phone_number.as_deref().map(str::trim) {
        if !phone.is_empty() && state.users.find_by_phone(phone).await?.is_some() {
            warn!("phone number already registered");
            return Err(ApiError::bad_request(DUPLICATE_PHONE));
        }
    }

    let valid = payload.validate().map_err(|errors| {
        warn!("registration rejected");
        ApiError::validation(errors)
    })?;

    let password_hash = hash_password(&valid.password)?;
    let user = state
        .users
        .create(NewUser {
            email: valid.email,
            phone_number: valid.phone_number,
            password_hash,
            first_name: valid.first_name,
            last_name: valid.last_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(Message::new("Account created successfully")),
    ))
}

/// Forgot-password step one: store a fresh code against the account.
/// Delivery by email is not wired up.
#[instrument(skip(state, payload))]
pub async fn request_otp(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<OtpRequest>,
) -> Result<Json<Message>, ApiError> {
    let mut errors = FieldErrors::default();
    let Some(email) = validation::email(&mut errors, payload.email.as_deref(), true) else {
        return Err(ApiError::validation(errors));
    };

    let slot = generate_otp(OffsetDateTime::now_utc(), state.config.otp.ttl_minutes);
    if !state.users.set_one_time_password(&email, &slot).await? {
        warn!(email = %email, "otp requested for unknown email");
        return Err(ApiError::bad_request(
            "Email does not exist. Enter a valid email id.",
        ));
    }

    info!(email = %email, "one-time password issued");
    Ok(Json(Message::new("OTP sent successfully to your email")))
}

/// Forgot-password step two: swap the password when the code matches.
#[instrument(skip(state, payload))]
pub async fn confirm_reset(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> Result<Json<Message>, ApiError> {
    let req = payload.validate().map_err(ApiError::validation)?;

    let Some(user) = state.users.find_by_email(&req.email).await? else {
        warn!(email = %req.email, "password reset for unknown email");
        return Err(ApiError::bad_request(INVALID_OTP));
    };

    let max_attempts = state.config.otp.max_attempts;
    let Some(claim) = state.users.claim_otp_attempt(user.id, max_attempts).await? else {
        if user.otp.is_none() {
            warn!(user_id = %user.id, "no outstanding otp");
            return Err(ApiError::bad_request(INVALID_OTP));
        }
        warn!(user_id = %user.id, "otp attempts used up");
        state.users.clear_one_time_password(user.id).await?;
        return Err(ApiError::bad_request(TOO_MANY_ATTEMPTS));
    };

    match check_otp(&claim, &req.otp, OffsetDateTime::now_utc()) {
        OtpCheck::Valid => {}
        OtpCheck::Mismatch => {
            warn!(user_id = %user.id, attempts = claim.otp_attempts, "wrong otp");
            if claim.otp_attempts >= max_attempts {
                state.users.clear_one_time_password(user.id).await?;
            }
            return Err(ApiError::bad_request(INVALID_OTP));
        }
        OtpCheck::Expired => {
            state.users.clear_one_time_password(user.id).await?;
            return Err(ApiError::bad_request("OTP has expired. Request a new one."));
        }
    }

    let password_hash = hash_password(&req.new_password)?;
    let changed = state
        .users
        .reset_password(user.id, &password_hash, &claim.otp)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "password reset failed");
            ApiError::Internal(e)
        })?;
    if !changed {
        warn!(user_id = %user.id, "otp consumed by another request");
        return Err(ApiError::bad_request(INVALID_OTP));
    }

    info!(user_id = %user.id, "password reset");
    Ok(Json(Message::new("Password changed successfully")))
}
