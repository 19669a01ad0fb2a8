use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::DocumentStore;
use crate::{
    error::HubError,
    models::{
        progress::{ProgressRecord, UnitProgress},
        qotd::AttemptRecord,
        user::{AuthProvider, Preferences, User},
    },
};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    progress: HashMap<String, ProgressRecord>,
    attempts: BTreeMap<String, AttemptRecord>,
}

/// Process-local store with the same semantics as the MongoDB one.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_user<F>(&self, user_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| HubError::NotFound("User not found".to_string()))?;
        apply(user);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn find_user<P>(&self, predicate: P) -> Result<Option<User>>
    where
        P: Fn(&User) -> bool + Send,
    {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|user| predicate(user)).cloned())
    }

    async fn update_unit<F>(&self, user_id: &str, unit_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut UnitProgress) + Send,
    {
        let mut inner = self.inner.write().await;
        let record = inner
            .progress
            .entry(user_id.to_string())
            .or_insert_with(|| ProgressRecord {
                user_id: user_id.to_string(),
                units: BTreeMap::new(),
            });
        apply(record.units.entry(unit_id.to_string()).or_default());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        let email_taken = user.email.as_ref().is_some_and(|email| {
            inner
                .users
                .values()
                .any(|existing| existing.email.as_ref() == Some(email))
        });
        if inner.users.contains_key(&user.id) || email_taken {
            return Err(HubError::Conflict("Account already exists".to_string()).into());
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user(|user| user.email.as_deref() == Some(email))
            .await
    }

    async fn find_user_by_provider_subject(
        &self,
        provider: AuthProvider,
        subject: &str,
    ) -> Result<Option<User>> {
        self.find_user(|user| {
            user.provider == provider && user.provider_subject.as_deref() == Some(subject)
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_user(|user| user.username.as_deref() == Some(username))
            .await
    }

    async fn find_user_by_verification_token(&self, token_hash: &str) -> Result<Option<User>> {
        self.find_user(|user| user.verification_token_hash.as_deref() == Some(token_hash))
            .await
    }

    async fn set_username(&self, user_id: &str, username: &str) -> Result<()> {
        let username = username.to_string();
        self.update_user(user_id, move |user| user.username = Some(username))
            .await
    }

    async fn set_verification_token(
        &self,
        user_id: &str,
        token_hash: Option<&str>,
    ) -> Result<()> {
        let token_hash = token_hash.map(str::to_string);
        self.update_user(user_id, move |user| user.verification_token_hash = token_hash)
            .await
    }

    async fn mark_email_verified(&self, user_id: &str) -> Result<()> {
        self.update_user(user_id, |user| {
            user.email_verified = true;
            user.verification_token_hash = None;
        })
        .await
    }

    async fn set_preferences(&self, user_id: &str, preferences: &Preferences) -> Result<()> {
        let preferences = preferences.clone();
        self.update_user(user_id, move |user| user.preferences = preferences)
            .await
    }

    async fn usernames(&self, user_ids: &[String]) -> Result<HashMap<String, String>> {
        let inner = self.inner.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                inner
                    .users
                    .get(id)
                    .and_then(|user| user.username.clone())
                    .map(|name| (id.clone(), name))
            })
            .collect())
    }

    async fn get_progress(&self, user_id: &str) -> Result<Option<ProgressRecord>> {
        Ok(self.inner.read().await.progress.get(user_id).cloned())
    }

    async fn mark_subunit_complete(
        &self,
        user_id: &str,
        unit_id: &str,
        subunit_id: &str,
    ) -> Result<()> {
        let subunit_id = subunit_id.to_string();
        self.update_unit(user_id, unit_id, move |unit| {
            unit.subunits.insert(subunit_id, true);
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
        self.update_unit(user_id, unit_id, move |unit| {
            unit.final_quiz_completed = completed;
            unit.final_quiz_highest_score = Some(highest_score);
        })
        .await
    }

    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.attempts.contains_key(&attempt.id) {
            return Err(HubError::Conflict(
                "Today's question has already been answered".to_string(),
            )
            .into());
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, user_id: &str, date: &str) -> Result<Option<AttemptRecord>> {
        let id = AttemptRecord::document_id(user_id, date);
        Ok(self.inner.read().await.attempts.get(&id).cloned())
    }

    async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .filter(|attempt| attempt.uid == user_id)
            .cloned()
            .collect())
    }

    async fn all_attempts(&self) -> Result<Vec<AttemptRecord>> {
        Ok(self.inner.read().await.attempts.values().cloned().collect())
    }
}
