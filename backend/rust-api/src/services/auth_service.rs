use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use super::{email_service::Mailer, identity::IdentityVerifier};
use crate::{
    error::HubError,
    metrics::AUTH_EVENTS_TOTAL,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{
        AuthProvider, AuthResponse, LoginRequest, Preferences, RegisterRequest, RegisterResponse,
        User, UserProfile,
    },
    store::DocumentStore,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    identity: Arc<dyn IdentityVerifier>,
    jwt_service: JwtService,
    access_token_ttl_seconds: i64,
    public_base_url: String,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityVerifier>,
        jwt_service: JwtService,
        access_token_ttl_seconds: i64,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            identity,
            jwt_service,
            access_token_ttl_seconds,
            public_base_url,
            bcrypt_cost: DEFAULT_COST,
        }
    }

    /// Lower bcrypt cost for tests.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.bcrypt_cost).context("Failed to hash password")
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        verify(password, hash).context("Failed to verify password")
    }

    /// Creates an unverified password account and mails the verification link.
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse> {
        let email = normalize_email(&req.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(HubError::Conflict(
                "An account with this email already exists".to_string(),
            )
            .into());
        }

        let password_hash = self.hash_password(&req.password)?;
        let token = generate_verification_token();

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.clone()),
            password_hash: Some(password_hash),
            provider: AuthProvider::Password,
            provider_subject: None,
            email_verified: false,
            verification_token_hash: Some(hash_token(&token)),
            username: None,
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;
        AUTH_EVENTS_TOTAL.with_label_values(&["register"]).inc();
        tracing::info!(user_id = %user.id, email = %email, "Registered password account");

        self.send_verification(&email, &token).await;

        Ok(RegisterResponse {
            user: UserProfile::from(user),
            verification_required: true,
        })
    }

    pub async fn verify_email(&self, token: &str) -> Result<UserProfile> {
        let token = token.trim();
        if token.is_empty() {
            return Err(HubError::Validation("Verification token is required".to_string()).into());
        }

        let user = self
            .store
            .find_user_by_verification_token(&hash_token(token))
            .await?
            .ok_or_else(|| {
                HubError::Validation("Invalid or already used verification token".to_string())
            })?;

        self.store.mark_email_verified(&user.id).await?;
        AUTH_EVENTS_TOTAL.with_label_values(&["email_verified"]).inc();
        tracing::info!(user_id = %user.id, "Email verified");

        let user = self
            .store
            .get_user(&user.id)
            .await?
            .ok_or_else(|| HubError::NotFound("User not found".to_string()))?;
        Ok(UserProfile::from(user))
    }

    /// Issues a fresh link for unverified password accounts. Silent otherwise,
    /// so the endpoint does not reveal which emails are registered.
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::debug!("Verification resend for unknown email {}", email);
            return Ok(());
        };
        if user.email_verified || user.provider != AuthProvider::Password {
            return Ok(());
        }

        let token = generate_verification_token();
        self.store
            .set_verification_token(&user.id, Some(&hash_token(&token)))
            .await?;
        self.send_verification(&email, &token).await;
        Ok(())
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        let email = normalize_email(&req.email);

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| HubError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let Some(password_hash) = user.password_hash.as_deref() else {
            // Google accounts have no password
            return Err(HubError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
        };

        if !self.verify_password(&req.password, password_hash)? {
            AUTH_EVENTS_TOTAL.with_label_values(&["login_failed"]).inc();
            tracing::warn!(email = %email, "Failed login attempt: invalid password");
            return Err(HubError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
        }

        if !user.email_verified {
            AUTH_EVENTS_TOTAL
                .with_label_values(&["login_unverified"])
                .inc();
            return Err(HubError::Forbidden(
                "Please verify your email address before signing in".to_string(),
            )
            .into());
        }

        AUTH_EVENTS_TOTAL.with_label_values(&["login"]).inc();
        tracing::info!(user_id = %user.id, "Successful login");
        self.auth_response(user)
    }

    /// Signs in with a Google ID token, creating the account on first use.
    pub async fn google_sign_in(&self, id_token: &str) -> Result<AuthResponse> {
        let identity = self.identity.verify(id_token).await?;

        if let Some(user) = self
            .store
            .find_user_by_provider_subject(AuthProvider::Google, &identity.subject)
            .await?
        {
            AUTH_EVENTS_TOTAL.with_label_values(&["google_login"]).inc();
            return self.auth_response(user);
        }

        if let Some(email) = identity.email.as_deref() {
            if self.store.find_user_by_email(email).await?.is_some() {
                return Err(HubError::Conflict(
                    "An account with this email already exists; sign in with your password"
                        .to_string(),
                )
                .into());
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            password_hash: None,
            provider: AuthProvider::Google,
            provider_subject: Some(identity.subject.clone()),
            email_verified: identity.email_verified,
            verification_token_hash: None,
            username: None,
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;
        AUTH_EVENTS_TOTAL.with_label_values(&["google_register"]).inc();
        tracing::info!(user_id = %user.id, "Created account from Google sign-in");

        self.auth_response(user)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse> {
        let access_token = self.generate_access_token(&user.id)?;
        Ok(AuthResponse {
            access_token,
            user: UserProfile::from(user),
        })
    }

    pub fn generate_access_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_ttl_seconds);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        self.jwt_service
            .generate_token(claims)
            .map_err(|e| anyhow::anyhow!("Failed to generate token: {}", e))
    }

    fn verification_url(&self, token: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.public_base_url)
            .and_then(|base| base.join("verify-email"))
            .context("Invalid public base URL")?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.to_string())
    }

    async fn send_verification(&self, email: &str, token: &str) {
        let result = match self.verification_url(token) {
            Ok(link) => self.mailer.send_verification_email(email, &link).await,
            Err(e) => Err(e),
        };
        // The account exists either way; the user can ask for another link
        if let Err(e) = result {
            tracing::error!("Failed to send verification email to {}: {:#}", email, e);
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_verification_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// Verification tokens are stored only as SHA-256 digests.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
