use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::repo_types::{ProfileChanges, User},
    auth::extractors::AuthUser,
    error::{ApiError, FieldErrors},
    extract::JsonBody,
    images::services::{discard_image, ext_from_mime, presign_image, upload_profile_image, UploadItem},
    profile::dto::{
        parse_gender, parse_topics, OnboardingSaved, ProfileResponse, ProfileUpdated,
        UpdateProfileRequest,
    },
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile/details", get(get_profile))
        .route("/update/user-profile", patch(update_profile))
        .route(
            "/user/onboarding-details",
            post(onboarding).layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // 10MB
        )
}

async fn to_response(state: &AppState, user: User) -> ProfileResponse {
    let image = match user.profile_image.as_deref() {
        Some(key) => presign_image(state, key).await,
        None => None,
    };
    ProfileResponse::new(user, image)
}

/// The caller's record, found through the token's email claim when it has one.
async fn caller_by_email(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    let user = match auth.email.as_deref() {
        Some(email) => state.users.find_by_email(email).await?,
        None => state.users.find_by_id(auth.id).await?,
    };
    user.ok_or_else(|| {
        warn!(user_id = %auth.id, "caller no longer resolves to a user");
        ApiError::user_missing()
    })
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Some(user) = state.users.find_by_id(auth.id).await? else {
        warn!("profile for a vanished user");
        return Err(ApiError::user_missing());
    };
    Ok(Json(to_response(&state, user).await))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdated>, ApiError> {
    let changes = payload.validate().map_err(|errors| {
        warn!("profile update rejected");
        ApiError::validation(errors)
    })?;
    let user = caller_by_email(&state, &auth).await?;

    let mut errors = FieldErrors::default();
    if let Some(email) = changes.email.as_deref() {
        if matches!(state.users.find_by_email(email).await?, Some(other) if other.id != user.id) {
            errors.add("email", "user with this email already exists.");
        }
    }
    if let Some(phone) = changes.phone_number.as_deref() {
        if matches!(state.users.find_by_phone(phone).await?, Some(other) if other.id != user.id) {
            errors.add("phone_number", "user with this phone number already exists.");
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let user = if changes.is_empty() {
        user
    } else {
        state
            .users
            .update_profile(user.id, changes)
            .await?
            .ok_or_else(ApiError::user_missing)?
    };
    info!("profile updated");
    Ok(Json(ProfileUpdated {
        message: "Profile updated successfully".into(),
        user: to_response(&state, user).await,
    }))
}

#[derive(Default)]
struct OnboardingForm {
    topics: Option<String>,
    gender: Option<String>,
    image: Option<UploadItem>,
}

async fn read_onboarding_form(mut mp: Multipart) -> Result<OnboardingForm, ApiError> {
    let bad_body = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e, "unreadable multipart body");
        ApiError::bad_request("Invalid multipart body")
    };

    let mut form = OnboardingForm::default();
    while let Some(field) = mp.next_field().await.map_err(bad_body)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("topics") => form.topics = Some(field.text().await.map_err(bad_body)?),
            Some("gender") => form.gender = Some(field.text().await.map_err(bad_body)?),
            Some("profile_image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_body)?;
                form.image = Some(UploadItem { body, content_type });
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /user/onboarding-details (multipart)
/// Fields: topics (JSON array), gender, profile_image (file). Only topics is required.
#[instrument(skip(state, auth, mp), fields(user_id = %auth.id))]
pub async fn onboarding(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<OnboardingSaved>, ApiError> {
    let form = read_onboarding_form(mp?).await?;

    let topics = parse_topics(form.topics.as_deref())?;
    let mut errors = FieldErrors::default();
    let gender = parse_gender(&mut errors, form.gender.as_deref());
    if let Some(image) = &form.image {
        if image.body.is_empty() || ext_from_mime(&image.content_type).is_none() {
            errors.add("profile_image", "Upload a valid image.");
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let Some(user) = state.users.find_by_id(auth.id).await? else {
        warn!("onboarding for a vanished user");
        return Err(ApiError::user_missing());
    };

    let mut changes = ProfileChanges {
        gender,
        ..Default::default()
    };
    if let Some(image) = form.image {
        changes.profile_image = Some(upload_profile_image(&state, user.id, image).await?);
    }
    if !changes.is_empty() {
        let uploaded = changes.profile_image.clone();
        let saved = match state.users.update_profile(user.id, changes).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ApiError::user_missing()),
            Err(e) => Err(ApiError::from(e)),
        };
        if let Err(e) = saved {
            // the new object is orphaned if the row was not written
            if let Some(key) = uploaded.as_deref() {
                discard_image(&state, key).await;
            }
            return Err(e);
        }
        if let (Some(_), Some(old)) = (uploaded, user.profile_image.as_deref()) {
            discard_image(&state, old).await;
        }
    }

    let created = state.topics.add_topics(user.id, &topics).await.map_err(|e| {
        error!(error = %e, "saving learning topics failed");
        ApiError::Internal(e)
    })?;
    info!(topics = created.len(), "onboarding saved");
    Ok(Json(OnboardingSaved {
        message: "Onboarding details saved successfully".into(),
        topics: created,
    }))
}
