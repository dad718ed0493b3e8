use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::lessons::repo_types::CreatedLesson;

#[async_trait]
pub trait LessonRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, lesson_name: &str) -> anyhow::Result<CreatedLesson>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CreatedLesson>>;
    async fn delete(&self, lesson_id: Uuid) -> anyhow::Result<Option<CreatedLesson>>;
}

#[derive(Clone)]
pub struct PgLessonRepo {
    db: PgPool,
}

impl PgLessonRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LessonRepo for PgLessonRepo {
    async fn create(&self, user_id: Uuid, lesson_name: &str) -> anyhow::Result<CreatedLesson> {
        let lesson = sqlx::query_as::<_, CreatedLesson>(
            r#"
            INSERT INTO created_lessons (id, user_id, lesson_name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, lesson_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(lesson_name)
        .fetch_one(&self.db)
        .await
        .context("insert lesson")?;
        Ok(lesson)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CreatedLesson>> {
        let rows = sqlx::query_as::<_, CreatedLesson>(
            r#"
            SELECT id, user_id, lesson_name, created_at
              FROM created_lessons
             WHERE user_id = $1
             ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list lessons")?;
        Ok(rows)
    }

    async fn delete(&self, lesson_id: Uuid) -> anyhow::Result<Option<CreatedLesson>> {
        let row = sqlx::query_as::<_, CreatedLesson>(
            r#"
            DELETE FROM created_lessons
             WHERE id = $1
            RETURNING id, user_id, lesson_name, created_at
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&self.db)
        .await
        .context("delete lesson")?;
        Ok(row)
    }
}
