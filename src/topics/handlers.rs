use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    response::Message,
    state::AppState,
    topics::repo_types::LearningTopic,
};

#[derive(Debug, Serialize)]
pub struct TopicList {
    pub message: String,
    pub topics: Vec<LearningTopic>,
}

pub fn topic_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/retrieve/specific-user-all-learning-topics",
            get(list_topics),
        )
        .route("/delete/user-learning-topic/:topic_id", delete(delete_topic))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn list_topics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TopicList>, ApiError> {
    let topics = state.topics.list_by_user(auth.id).await?;
    Ok(Json(TopicList {
        message: "Learning topics retrieved successfully".into(),
        topics,
    }))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let Ok(topic_id) = Uuid::parse_str(&raw_id) else {
        warn!(topic_id = %raw_id, "malformed topic id");
        return Err(ApiError::cannot_complete("Learning topic not found"));
    };
    let Some(topic) = state.topics.delete(topic_id).await? else {
        warn!(%topic_id, "topic not found");
        return Err(ApiError::cannot_complete("Learning topic not found"));
    };
    if topic.user_id != auth.id {
        // Deletion is not restricted to the owner.
        warn!(%topic_id, owner = %topic.user_id, "deleted a topic owned by another user");
    }
    info!(%topic_id, "learning topic deleted");
    Ok(Json(Message::new("Learning topic deleted successfully")))
}
