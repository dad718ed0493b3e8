use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AccessToken, LoginRequest, RefreshRequest, TokenPair},
        services::{verify_password, JwtKeys},
    },
    error::{ApiError, FieldErrors},
    extract::JsonBody,
    state::AppState,
    validation,
};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/login/refresh-token", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let mut errors = FieldErrors::default();
    let email = validation::required(&mut errors, "email", payload.email.as_deref(), 254)
        .map(|e| validation::normalize_email(&e));
    let password = match payload.password {
        Some(p) if !p.is_empty() => Some(p),
        Some(_) => {
            errors.add("password", validation::BLANK);
            None
        }
        None => {
            errors.add("password", validation::REQUIRED);
            None
        }
    };
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::validation(errors));
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let pair = JwtKeys::from_ref(&state).issue_pair(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<Json<AccessToken>, ApiError> {
    let Some(token) = payload.refresh.filter(|t| !t.is_empty()) else {
        let mut errors = FieldErrors::default();
        errors.add("refresh", validation::REQUIRED);
        return Err(ApiError::validation(errors));
    };

    let access = JwtKeys::from_ref(&state)
        .refresh_access(&token)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            ApiError::unauthorized("Token is invalid or expired")
        })?;
    Ok(Json(AccessToken { access }))
}
