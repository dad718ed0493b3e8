use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A lesson a user wrote for themselves.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CreatedLesson {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub lesson_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
