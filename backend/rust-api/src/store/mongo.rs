use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use std::collections::HashMap;

use super::{DocumentStore, ATTEMPTS_COLLECTION, PROGRESS_COLLECTION, USERS_COLLECTION};
use crate::{
    error::HubError,
    metrics::track_db_operation,
    models::{
        progress::ProgressRecord,
        qotd::AttemptRecord,
        user::{AuthProvider, Preferences, User},
    },
    utils::time::chrono_to_bson,
};

const DUPLICATE_KEY_CODE: i32 = 11000;

pub struct MongoStore {
    mongo: Database,
}

impl MongoStore {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Unique email and attempt lookups by user. Usernames are deliberately not
    /// indexed as unique; availability is a check-then-write.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        self.users()
            .create_index(email_index)
            .await
            .context("Failed to create users.email index")?;

        let uid_index = IndexModel::builder().keys(doc! { "uid": 1 }).build();
        self.attempts()
            .create_index(uid_index)
            .await
            .context("Failed to create qotd_attempts.uid index")?;

        tracing::info!("MongoDB indexes ensured");
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.mongo.collection::<User>(USERS_COLLECTION)
    }

    fn progress(&self) -> Collection<ProgressRecord> {
        self.mongo.collection::<ProgressRecord>(PROGRESS_COLLECTION)
    }

    fn attempts(&self) -> Collection<AttemptRecord> {
        self.mongo.collection::<AttemptRecord>(ATTEMPTS_COLLECTION)
    }

    async fn update_user(&self, operation: &str, user_id: &str, set: Document) -> Result<()> {
        let mut set = set;
        set.insert("updatedAt", chrono_to_bson(chrono::Utc::now()));
        track_db_operation(operation, USERS_COLLECTION, async {
            let result = self
                .users()
                .update_one(doc! { "_id": user_id }, doc! { "$set": set })
                .await
                .context("Failed to update user")?;
            if result.matched_count == 0 {
                return Err(HubError::NotFound("User not found".to_string()).into());
            }
            Ok(())
        })
        .await
    }

    async fn find_user(&self, operation: &str, filter: Document) -> Result<Option<User>> {
        track_db_operation(operation, USERS_COLLECTION, async {
            self.users()
                .find_one(filter)
                .await
                .context("Failed to query user")
        })
        .await
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.mongo
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        track_db_operation("insert", USERS_COLLECTION, async {
            match self.users().insert_one(user).await {
                Ok(_) => Ok(()),
                Err(e) if is_duplicate_key(&e) => {
                    Err(HubError::Conflict("Account already exists".to_string()).into())
                }
                Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user")),
            }
        })
        .await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.find_user("find_one", doc! { "_id": user_id }).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user("find_by_email", doc! { "email": email })
            .await
    }

    async fn find_user_by_provider_subject(
        &self,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<Option<User>> {
        self.find_user(
            "find_by_subject",
            doc! { "provider": provider.as_str(), "provider_subject": subject },
        )
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user("find_by_username", doc! { "username": username })
            .await
    }

    async fn find_user_by_verification_token(&self, token_hash: &str) -> Result<Option<User>> {
        self.find_user(
            "find_by_verification_token",
            doc! { "verification_token_hash": token_hash },
        )
        .await
    }

    async fn set_username(&self, user_id: &str, username: &str) -> Result<()> {
        self.update_user("set_username", user_id, doc! { "username": username })
            .await
    }

    async fn set_verification_token(
        &self,
        user_id: &str,
        token_hash: Option<&str>,
    ) -> Result<()> {
        let set = match token_hash {
            Some(hash) => doc! { "verification_token_hash": hash },
            None => doc! { "verification_token_hash": mongodb::bson::Bson::Null },
        };
        self.update_user("set_verification_token", user_id, set)
            .await
    }

    async fn mark_email_verified(&self, user_id: &str) -> Result<()> {
        self.update_user(
            "mark_email_verified",
            user_id,
            doc! { "email_verified": true, "verification_token_hash": mongodb::bson::Bson::Null },
        )
        .await
    }

    async fn set_preferences(&self, user_id: &str, preferences: &Preferences) -> Result<()> {
        let value = mongodb::bson::to_bson(preferences).context("Failed to encode preferences")?;
        self.update_user("set_preferences", user_id, doc! { "preferences": value })
            .await
    }

    async fn usernames(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        track_db_operation("find_usernames", USERS_COLLECTION, async {
            let users: Vec<User> = self
                .users()
                .find(doc! { "_id": { "$in": user_ids.to_vec() } })
                .await
                .context("Failed to query usernames")?
                .try_collect()
                .await
                .context("Failed to read usernames")?;
            Ok(users
                .into_iter()
                .filter_map(|user| user.username.map(|name| (user.id, name)))
                .collect())
        })
        .await
    }

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressRecord>> {
        track_db_operation("find_one", PROGRESS_COLLECTION, async {
            self.progress()
                .find_one(doc! { "_id": user_id })
                .await
                .context("Failed to query progress")
        })
        .await
    }

    async fn mark_subunit_complete(
        &self,
        user_id: &str,
        unit_id: &str,
        subunit_id: &str,
    ) -> Result<()> {
        let mut set = Document::new();
        set.insert(format!("units.{}.subunits.{}", unit_id, subunit_id), true);
        track_db_operation("mark_subunit", PROGRESS_COLLECTION, async {
            self.progress()
                .update_one(doc! { "_id": user_id }, doc! { "$set": set })
                .upsert(true)
                .await
                .context("Failed to mark subunit complete")?;
            Ok(())
        })
        .await
    }

    async fn set_final_quiz_result(
        &self,
        user_id: &str,
        unit_id: &str,
        completed: bool,
        highest_score: f64,
    ) -> Result<()> {
        let mut set = Document::new();
        set.insert(format!("units.{}.finalQuizCompleted", unit_id), completed);
        set.insert(
            format!("units.{}.finalQuizHighestScore", unit_id),
            highest_score,
        );
        track_db_operation("set_final_quiz", PROGRESS_COLLECTION, async {
            self.progress()
                .update_one(doc! { "_id": user_id }, doc! { "$set": set })
                .upsert(true)
                .await
                .context("Failed to record final quiz")?;
            Ok(())
        })
        .await
    }

    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        track_db_operation("insert", ATTEMPTS_COLLECTION, async {
            match self.attempts().insert_one(attempt).await {
                Ok(_) => Ok(()),
                Err(e) if is_duplicate_key(&e) => Err(HubError::Conflict(
                    "Today's question has already been answered".to_string(),
                )
                .into()),
                Err(e) => Err(anyhow::Error::new(e).context("Failed to insert attempt")),
            }
        })
        .await
    }

    async fn get_attempt(&self, user_id: &str, date: &str) -> Result<Option<AttemptRecord>> {
        let id = AttemptRecord::document_id(user_id, date);
        track_db_operation("find_one", ATTEMPTS_COLLECTION, async {
            self.attempts()
                .find_one(doc! { "_id": id })
                .await
                .context("Failed to query attempt")
        })
        .await
    }

    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>> {
        track_db_operation("find_by_user", ATTEMPTS_COLLECTION, async {
            self.attempts()
                .find(doc! { "uid": user_id })
                .await
                .context("Failed to query attempts")?
                .try_collect()
                .await
                .context("Failed to read attempts")
        })
        .await
    }

    async fn all_attempts(&self) -> Result<Vec<AttemptRecord>> {
        track_db_operation("find_all", ATTEMPTS_COLLECTION, async {
            self.attempts()
                .find(doc! {})
                .await
                .context("Failed to scan attempts")?
                .try_collect()
                .await
                .context("Failed to read attempts")
        })
        .await
    }
}
