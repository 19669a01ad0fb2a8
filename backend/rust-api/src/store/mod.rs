//! Document storage for users, progress and daily-question attempts.
//!
//! Production runs against MongoDB; tests and local demos use the in-memory
//! store. Both keep the same document shapes and the same conflict rules.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::{
    progress::ProgressRecord,
    qotd::AttemptRecord,
    user::{AuthProvider, Preferences, User},
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const USERS_COLLECTION: &str = "users";
pub const PROGRESS_COLLECTION: &str = "progress";
pub const ATTEMPTS_COLLECTION: &str = "qotd_attempts";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Fails with `HubError::Conflict` when the id or email is already present.
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_provider_subject(
        &self,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_user_by_verification_token(&self, token_hash: &str) -> Result<Option<User>>;
    /// Plain write; callers check availability first (no transaction).
    async fn set_username(&self, user_id: &str, username: &str) -> Result<()>;
    async fn set_verification_token(&self, user_id: &str, token_hash: Option<&str>)
        -> Result<()>;
    async fn mark_email_verified(&self, user_id: &str) -> Result<()>;
    async fn set_preferences(&self, user_id: &str, preferences: &Preferences) -> Result<()>;
    /// user id -> username for the users that have one
    async fn usernames(&self, user_ids: &[String]) -> Result<HashMap<String, String>>;

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressRecord>>;
    async fn mark_subunit_complete(
        &self,
        user_id: &str,
        unit_id: &str,
        subunit_id: &str,
    ) -> Result<()>;
    async fn set_final_quiz_result(
        &self,
        user_id: &str,
        unit_id: &str,
        completed: bool,
        highest_score: f64,
    ) -> Result<()>;

    /// Fails with `HubError::Conflict` when the user already answered that day.
    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<()>;
    async fn get_attempt(&self, user_id: &str, date: &str) -> Result<Option<AttemptRecord>>;
    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>>;
    async fn all_attempts(&self) -> Result<Vec<AttemptRecord>>;
}
