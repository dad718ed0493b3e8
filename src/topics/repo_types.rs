use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A learning topic picked by a user during onboarding.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LearningTopic {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub topic: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
