use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, FieldErrors},
    extract::JsonBody,
    lessons::repo_types::CreatedLesson,
    response::Message,
    state::AppState,
    validation,
};

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub lesson_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LessonCreated {
    pub message: String,
    pub lesson: CreatedLesson,
}

#[derive(Debug, Serialize)]
pub struct LessonList {
    pub message: String,
    pub lessons: Vec<CreatedLesson>,
}

pub fn lesson_routes() -> Router<AppState> {
    Router::new()
        .route("/user/add-custom-lesson", post(create_lesson))
        .route("/user/delete-custom-lesson/:lesson_id", delete(delete_lesson))
        .route("/user/get-custom-lessons", get(list_lessons))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn create_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CreateLessonRequest>,
) -> Result<(StatusCode, Json<LessonCreated>), ApiError> {
    let mut errors = FieldErrors::default();
    let Some(lesson_name) =
        validation::required(&mut errors, "lesson_name", payload.lesson_name.as_deref(), 255)
    else {
        return Err(ApiError::validation(errors));
    };

    if state.users.find_by_id(auth.id).await?.is_none() {
        warn!("lesson for a vanished user");
        return Err(ApiError::user_missing());
    }

    let lesson = state.lessons.create(auth.id, &lesson_name).await?;
    info!(lesson_id = %lesson.id, "lesson created");
    Ok((
        StatusCode::CREATED,
        Json(LessonCreated {
            message: "Lesson added successfully".into(),
            lesson,
        }),
    ))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let Ok(lesson_id) = Uuid::parse_str(&raw_id) else {
        warn!(lesson_id = %raw_id, "malformed lesson id");
        return Err(ApiError::cannot_complete("Lesson not found"));
    };
    let Some(lesson) = state.lessons.delete(lesson_id).await? else {
        warn!(%lesson_id, "lesson not found");
        return Err(ApiError::cannot_complete("Lesson not found"));
    };
    if lesson.user_id != auth.id {
        // Deletion is not restricted to the owner.
        warn!(%lesson_id, owner = %lesson.user_id, "deleted a lesson owned by another user");
    }
    info!(%lesson_id, "lesson deleted");
    Ok(Json(Message::new("Lesson deleted successfully")))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_lessons(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<LessonList>, ApiError> {
    let lessons = state.lessons.list_by_user(auth.id).await?;
    Ok(Json(LessonList {
        message: "Lessons retrieved successfully".into(),
        lessons,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use crate::test_support::{register_and_login, send, send_raw, TestApp};

    #[tokio::test]
    async fn create_list_delete() {
        let app = TestApp::new();
        let token = register_and_login(&app, "a@x.com", "111").await;

        for name in ["Ownership", "Lifetimes"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/v1/user/add-custom-lesson",
                Some(&token),
                Some(json!({ "lesson_name": name })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["lesson"]["lesson_name"], name);
            assert!(body["lesson"].get("user_id").is_none());
        }

        let (status, body) =
            send(&app, Method::GET, "/api/v1/user/get-custom-lessons", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let lessons = body["lessons"].as_array().unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0]["lesson_name"], "Ownership");

        let uri = format!(
            "/api/v1/user/delete-custom-lesson/{}",
            lessons[0]["id"].as_str().unwrap()
        );
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot complete the request");
    }

    #[tokio::test]
    async fn malformed_lesson_id_cannot_complete() {
        let app = TestApp::new();
        let token = register_and_login(&app, "a@x.com", "111").await;
        for _ in 0..2 {
            let (status, body) = send(
                &app,
                Method::DELETE,
                "/api/v1/user/delete-custom-lesson/42",
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "Cannot complete the request");
        }
    }

    #[tokio::test]
    async fn any_caller_may_delete_a_lesson() {
        let app = TestApp::new();
        let alice = register_and_login(&app, "alice@x.com", "111").await;
        let bob = register_and_login(&app, "bob@x.com", "222").await;

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            Some(&alice),
            Some(json!({ "lesson_name": "Traits" })),
        )
        .await;
        let uri = format!(
            "/api/v1/user/delete-custom-lesson/{}",
            body["lesson"]["id"].as_str().unwrap()
        );

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Lesson deleted successfully");

        let (_, body) =
            send(&app, Method::GET, "/api/v1/user/get-custom-lessons", Some(&alice), None).await;
        assert!(body["lessons"].as_array().unwrap().is_empty());
        assert_eq!(app.store.lesson_count(), 0);
    }

    #[tokio::test]
    async fn non_json_lesson_body_gets_json_error() {
        let app = TestApp::new();
        let token = register_and_login(&app, "a@x.com", "111").await;
        let (status, body) = send_raw(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            Some(&token),
            "lesson_name=Traits",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please check the entered details");
        assert_eq!(app.store.lesson_count(), 0);
    }

    #[tokio::test]
    async fn lessons_are_scoped_to_the_caller() {
        let app = TestApp::new();
        let alice = register_and_login(&app, "alice@x.com", "111").await;
        let bob = register_and_login(&app, "bob@x.com", "222").await;

        send(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            Some(&alice),
            Some(json!({ "lesson_name": "Traits" })),
        )
        .await;

        let (_, body) =
            send(&app, Method::GET, "/api/v1/user/get-custom-lessons", Some(&bob), None).await;
        assert!(body["lessons"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::new();
        let token = register_and_login(&app, "a@x.com", "111").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            Some(&token),
            Some(json!({ "lesson_name": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["lesson_name"].is_array());
    }

    #[tokio::test]
    async fn unauthenticated_create_stores_nothing() {
        let app = TestApp::new();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            None,
            Some(json!({ "lesson_name": "Traits" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.store.lesson_count(), 0);
    }

    #[tokio::test]
    async fn vanished_user_gets_not_found() {
        let app = TestApp::new();
        let token = app.token_for(Uuid::new_v4(), "ghost@x.com");
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/user/add-custom-lesson",
            Some(&token),
            Some(json!({ "lesson_name": "Traits" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User does not exist");
        assert_eq!(app.store.lesson_count(), 0);
    }
}
