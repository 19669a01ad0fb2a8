use anyhow::Result;
use std::sync::Arc;

use super::{progress_service::ProgressService, qotd_service::QotdService};
use crate::{
    error::HubError,
    metrics::USERNAME_CLAIMS_TOTAL,
    models::{
        account::AccountSummary,
        user::{
            normalize_username, Preferences, Theme, User, UserProfile, UsernameAvailability,
            USERNAME_RULES,
        },
    },
    store::DocumentStore,
};

pub struct AccountService {
    store: Arc<dyn DocumentStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn user(&self, user_id: &str) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| HubError::NotFound("User not found".to_string()).into())
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        Ok(UserProfile::from(self.user(user_id).await?))
    }

    /// Whether `raw` could be claimed by `user_id` right now.
    pub async fn availability(&self, user_id: &str, raw: &str) -> Result<UsernameAvailability> {
        let Some(username) = normalize_username(raw) else {
            return Ok(UsernameAvailability {
                username: raw.trim().to_string(),
                valid: false,
                available: false,
            });
        };

        let available = match self.store.find_user_by_username(&username).await? {
            Some(owner) => owner.id == user_id,
            None => true,
        };

        Ok(UsernameAvailability {
            username,
            valid: true,
            available,
        })
    }

    /// Check-then-write: two users racing for the same name can both succeed.
    pub async fn claim_username(&self, user_id: &str, raw: &str) -> Result<UserProfile> {
        let Some(username) = normalize_username(raw) else {
            USERNAME_CLAIMS_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(HubError::Validation(USERNAME_RULES.to_string()).into());
        };

        let user = self.user(user_id).await?;
        if user.username.as_deref() == Some(username.as_str()) {
            USERNAME_CLAIMS_TOTAL.with_label_values(&["unchanged"]).inc();
            return Ok(UserProfile::from(user));
        }

        if let Some(owner) = self.store.find_user_by_username(&username).await? {
            if owner.id != user_id {
                USERNAME_CLAIMS_TOTAL.with_label_values(&["taken"]).inc();
                return Err(HubError::Conflict("Username already taken".to_string()).into());
            }
        }

        self.store.set_username(user_id, &username).await?;
        USERNAME_CLAIMS_TOTAL.with_label_values(&["claimed"]).inc();
        tracing::info!("User {} set username to {}", user_id, username);

        self.profile(user_id).await
    }

    pub async fn set_theme(&self, user_id: &str, theme: Theme) -> Result<UserProfile> {
        let mut preferences: Preferences = self.user(user_id).await?.preferences;
        preferences.theme = theme;
        self.store.set_preferences(user_id, &preferences).await?;
        self.profile(user_id).await
    }

    pub async fn summary(
        &self,
        user_id: &str,
        progress: &ProgressService,
        qotd: &QotdService,
    ) -> Result<AccountSummary> {
        let user = self.user(user_id).await?;
        Ok(AccountSummary {
            username: user.username,
            progress: progress.overview(user_id).await?,
            qotd: qotd.stats(user_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::AuthProvider;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.into(),
            email: Some(email.into()),
            password_hash: None,
            provider: AuthProvider::Google,
            provider_subject: Some(format!("sub-{}", id)),
            email_verified: true,
            verification_token_hash: None,
            username: None,
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded() -> AccountService {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(&user("u1", "one@example.com")).await.unwrap();
        store.insert_user(&user("u2", "two@example.com")).await.unwrap();
        AccountService::new(store)
    }

    #[tokio::test]
    async fn taken_username_conflicts_for_others_only() {
        let accounts = seeded().await;
        accounts.claim_username("u1", "  buret_boss ").await.unwrap();

        let err = accounts.claim_username("u2", "buret_boss").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<HubError>(), Some(HubError::Conflict(_))));

        // Re-saving your own name is fine
        let profile = accounts.claim_username("u1", "buret_boss").await.unwrap();
        assert_eq!(profile.username.as_deref(), Some("buret_boss"));
        assert!(!profile.needs_username);
    }

    #[tokio::test]
    async fn availability_reports_validity_and_ownership() {
        let accounts = seeded().await;
        accounts.claim_username("u1", "titrant").await.unwrap();

        let mine = accounts.availability("u1", "titrant").await.unwrap();
        assert!(mine.valid && mine.available);

        let theirs = accounts.availability("u2", "titrant").await.unwrap();
        assert!(theirs.valid && !theirs.available);

        let bad = accounts.availability("u2", "no").await.unwrap();
        assert!(!bad.valid && !bad.available);
    }

    #[tokio::test]
    async fn invalid_username_is_a_validation_error() {
        let accounts = seeded().await;
        let err = accounts.claim_username("u1", "bad name!").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<HubError>(), Some(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn theme_preference_persists() {
        let accounts = seeded().await;
        let profile = accounts.set_theme("u2", Theme::Dark).await.unwrap();
        assert_eq!(profile.preferences.theme, Theme::Dark);
        assert_eq!(
            accounts.profile("u2").await.unwrap().preferences.theme,
            Theme::Dark
        );
    }
}
