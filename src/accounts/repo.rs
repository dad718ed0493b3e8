use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::repo_types::{NewUser, OtpClaim, OtpSlot, ProfileChanges, User};
use crate::error::RepoError;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user; a taken email or phone number yields `RepoError::Conflict`.
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>>;
    /// Apply the supplied fields only. `Ok(None)` when the user is gone.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError>;
    /// Overwrite the OTP slot and reset its attempt counter. `false` when no such email.
    async fn set_one_time_password(&self, email: &str, slot: &OtpSlot) -> anyhow::Result<bool>;
    /// Count one attempt against the outstanding code, but only while fewer than
    /// `max_attempts` were made. `None` when there is no code or none are left.
    async fn claim_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> anyhow::Result<Option<OtpClaim>>;
    async fn clear_one_time_password(&self, id: Uuid) -> anyhow::Result<()>;
    /// Set a new password hash and clear the slot, provided it still holds the
    /// unexpired `code`. `false` when it does not.
    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        code: &str,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, phone_number, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, phone_number, password_hash, first_name, last_name,
                      profile_image, gender, otp, otp_expires_at, otp_attempts, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.phone_number)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, phone_number, password_hash, first_name, last_name,
                   profile_image, gender, otp, otp_expires_at, otp_attempts, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, phone_number, password_hash, first_name, last_name,
                   profile_image, gender, otp, otp_expires_at, otp_attempts, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, phone_number, password_hash, first_name, last_name,
                   profile_image, gender, otp, otp_expires_at, otp_attempts, created_at
            FROM users
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET first_name    = COALESCE($2, first_name),
                   last_name     = COALESCE($3, last_name),
                   email         = COALESCE($4, email),
                   phone_number  = COALESCE($5, phone_number),
                   profile_image = COALESCE($6, profile_image),
                   gender        = COALESCE($7, gender)
             WHERE id = $1
            RETURNING id, email, phone_number, password_hash, first_name, last_name,
                      profile_image, gender, otp, otp_expires_at, otp_attempts, created_at
            "#,
        )
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .bind(changes.phone_number)
        .bind(changes.profile_image)
        .bind(changes.gender.map(|g| g.as_str()))
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_one_time_password(&self, email: &str, slot: &OtpSlot) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET otp = $2, otp_expires_at = $3, otp_attempts = 0
             WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&slot.code)
        .bind(slot.expires_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn claim_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> anyhow::Result<Option<OtpClaim>> {
        let claim = sqlx::query_as::<_, OtpClaim>(
            r#"
            UPDATE users SET otp_attempts = otp_attempts + 1
             WHERE id = $1 AND otp IS NOT NULL AND otp_attempts < $2
            RETURNING otp, otp_expires_at, otp_attempts
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(&self.db)
        .await?;
        Ok(claim)
    }

    async fn clear_one_time_password(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE users SET otp = NULL, otp_expires_at = NULL, otp_attempts = 0 WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        code: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2, otp = NULL, otp_expires_at = NULL, otp_attempts = 0
             WHERE id = $1 AND otp = $3 AND otp_expires_at > now()
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(code)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
