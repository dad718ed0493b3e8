use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo::UserRepo;
use crate::accounts::repo_types::{NewUser, OtpClaim, OtpSlot, ProfileChanges, User};
use crate::error::RepoError;
use crate::lessons::repo::LessonRepo;
use crate::lessons::repo_types::CreatedLesson;
use crate::storage::StorageClient;
use crate::topics::repo::TopicRepo;
use crate::topics::repo_types::LearningTopic;

/// In-memory stand-in for the Postgres stores, with the same uniqueness rules.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    topics: Mutex<Vec<LearningTopic>>,
    lessons: Mutex<Vec<CreatedLesson>>,
    refuse_profile_updates: AtomicBool,
}

impl MemoryStore {
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn topic_count(&self) -> usize {
        self.topics.lock().unwrap().len()
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.lock().unwrap().len()
    }

    /// Make every later `update_profile` fail as if the database were down.
    pub fn refuse_profile_updates(&self) {
        self.refuse_profile_updates.store(true, Ordering::SeqCst);
    }

    fn with_user<T>(&self, id: Uuid, f: impl FnOnce(&mut User) -> T) -> Option<T> {
        self.users.lock().unwrap().iter_mut().find(|u| u.id == id).map(f)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict("email"));
        }
        if users.iter().any(|u| u.phone_number == new.phone_number) {
            return Err(RepoError::Conflict("phone_number"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            phone_number: new.phone_number,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            profile_image: None,
            gender: None,
            otp: None,
            otp_expires_at: None,
            otp_attempts: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.with_user(id, |u| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_phone(&self, phone_number: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.phone_number == phone_number)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError> {
        if self.refuse_profile_updates.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("profile store unavailable").into());
        }
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict("email"));
            }
        }
        if let Some(phone) = &changes.phone_number {
            if users.iter().any(|u| u.id != id && &u.phone_number == phone) {
                return Err(RepoError::Conflict("phone_number"));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.phone_number {
            user.phone_number = v;
        }
        if let Some(v) = changes.profile_image {
            user.profile_image = Some(v);
        }
        if let Some(g) = changes.gender {
            user.gender = Some(g.as_str().to_string());
        }
        Ok(Some(user.clone()))
    }

    async fn set_one_time_password(&self, email: &str, slot: &OtpSlot) -> anyhow::Result<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.email == email) else {
            return Ok(false);
        };
        user.otp = Some(slot.code.clone());
        user.otp_expires_at = Some(slot.expires_at);
        user.otp_attempts = 0;
        Ok(true)
    }

    async fn claim_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> anyhow::Result<Option<OtpClaim>> {
        Ok(self
            .with_user(id, |u| {
                let otp = u.otp.clone().filter(|_| u.otp_attempts < max_attempts)?;
                u.otp_attempts += 1;
                Some(OtpClaim {
                    otp,
                    otp_expires_at: u.otp_expires_at,
                    otp_attempts: u.otp_attempts,
                })
            })
            .flatten())
    }

    async fn clear_one_time_password(&self, id: Uuid) -> anyhow::Result<()> {
        self.with_user(id, |u| {
            u.otp = None;
            u.otp_expires_at = None;
            u.otp_attempts = 0;
        });
        Ok(())
    }

    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        code: &str,
    ) -> anyhow::Result<bool> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .with_user(id, |u| {
                let live = u.otp.as_deref() == Some(code)
                    && u.otp_expires_at.is_some_and(|at| at > now);
                if live {
                    u.password_hash = password_hash.to_string();
                    u.otp = None;
                    u.otp_expires_at = None;
                    u.otp_attempts = 0;
                }
                live
            })
            .unwrap_or(false))
    }
}

#[async_trait]
impl TopicRepo for MemoryStore {
    async fn add_topics(&self, user_id: Uuid, topics: &[String]) -> anyhow::Result<Vec<LearningTopic>> {
        let mut rows = self.topics.lock().unwrap();
        let created: Vec<LearningTopic> = topics
            .iter()
            .map(|topic| LearningTopic {
                id: Uuid::new_v4(),
                user_id,
                topic: topic.clone(),
                created_at: OffsetDateTime::now_utc(),
            })
            .collect();
        rows.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<LearningTopic>> {
        Ok(self
            .topics
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, topic_id: Uuid) -> anyhow::Result<Option<LearningTopic>> {
        let mut rows = self.topics.lock().unwrap();
        Ok(rows
            .iter()
            .position(|t| t.id == topic_id)
            .map(|i| rows.remove(i)))
    }
}

#[async_trait]
impl LessonRepo for MemoryStore {
    async fn create(&self, user_id: Uuid, lesson_name: &str) -> anyhow::Result<CreatedLesson> {
        let lesson = CreatedLesson {
            id: Uuid::new_v4(),
            user_id,
            lesson_name: lesson_name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.lessons.lock().unwrap().push(lesson.clone());
        Ok(lesson)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<CreatedLesson>> {
        Ok(self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, lesson_id: Uuid) -> anyhow::Result<Option<CreatedLesson>> {
        let mut rows = self.lessons.lock().unwrap();
        Ok(rows
            .iter()
            .position(|l| l.id == lesson_id)
            .map(|i| rows.remove(i)))
    }
}

/// Object store that keeps the keys it holds so tests can look for leftovers.
#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeSet<String>>,
}

impl MemoryBucket {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl StorageClient for MemoryBucket {
    async fn put_object(&self, key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().insert(key.to_string());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{}", key))
    }
}
