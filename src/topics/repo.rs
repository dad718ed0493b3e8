use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::topics::repo_types::LearningTopic;

#[async_trait]
pub trait TopicRepo: Send + Sync {
    /// One row per label, in the given order. Duplicates are kept.
    async fn add_topics(&self, user_id: Uuid, topics: &[String]) -> anyhow::Result<Vec<LearningTopic>>;
    /// Insertion order.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<LearningTopic>>;
    /// Returns the deleted row, `None` when the id did not resolve.
    async fn delete(&self, topic_id: Uuid) -> anyhow::Result<Option<LearningTopic>>;
}

#[derive(Clone)]
pub struct PgTopicRepo {
    db: PgPool,
}

impl PgTopicRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TopicRepo for PgTopicRepo {
    async fn add_topics(&self, user_id: Uuid, topics: &[String]) -> anyhow::Result<Vec<LearningTopic>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut created = Vec::with_capacity(topics.len());
        for topic in topics {
            let row = sqlx::query_as::<_, LearningTopic>(
                r#"
                INSERT INTO learning_topics (id, user_id, topic)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, topic, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(topic)
            .fetch_one(&mut *tx)
            .await
            .context("insert learning topic")?;
            created.push(row);
        }
        tx.commit().await.context("commit tx")?;
        Ok(created)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<LearningTopic>> {
        let rows = sqlx::query_as::<_, LearningTopic>(
            r#"
            SELECT id, user_id, topic, created_at
              FROM learning_topics
             WHERE user_id = $1
             ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list learning topics")?;
        Ok(rows)
    }

    async fn delete(&self, topic_id: Uuid) -> anyhow::Result<Option<LearningTopic>> {
        let row = sqlx::query_as::<_, LearningTopic>(
            r#"
            DELETE FROM learning_topics
             WHERE id = $1
            RETURNING id, user_id, topic, created_at
            "#,
        )
        .bind(topic_id)
        .fetch_optional(&self.db)
        .await
        .context("delete learning topic")?;
        Ok(row)
    }
}
