//! Federated sign-in: turns a Google ID token into a verified identity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::HubError;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    /// tokeninfo reports booleans as strings
    #[serde(default)]
    email_verified: Option<String>,
}

/// Validates ID tokens through Google's tokeninfo endpoint.
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: Option<String>,
    endpoint: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            client_id,
            endpoint: GOOGLE_TOKENINFO_URL.to_string(),
        })
    }

    fn check(&self, info: TokenInfo, client_id: &str) -> Result<VerifiedIdentity> {
        if info.aud != client_id {
            tracing::warn!("Google token issued for another client: {}", info.aud);
            return Err(HubError::Unauthorized("Invalid Google ID token".to_string()).into());
        }
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(HubError::Unauthorized("Invalid Google ID token".to_string()).into());
        }
        Ok(VerifiedIdentity {
            subject: info.sub,
            email: info.email.map(|email| email.trim().to_lowercase()),
            email_verified: info.email_verified.as_deref() == Some("true"),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity> {
        let Some(client_id) = self.client_id.as_deref() else {
            return Err(
                HubError::Forbidden("Google sign-in is not configured".to_string()).into(),
            );
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| HubError::Upstream(format!("Google tokeninfo unreachable: {}", e)))?;

        if response.status().is_client_error() {
            return Err(HubError::Unauthorized("Invalid Google ID token".to_string()).into());
        }
        if !response.status().is_success() {
            return Err(HubError::Upstream(format!(
                "Google tokeninfo returned status: {}",
                response.status()
            ))
            .into());
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| HubError::Upstream(format!("Malformed tokeninfo response: {}", e)))?;

        self.check(info, client_id)
    }
}
