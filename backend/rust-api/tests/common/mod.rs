#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use chemhub_api::{
    cache::MemoryCache,
    config::{Config, SiteSettings},
    create_router,
    error::HubError,
    models::qotd::Question,
    services::{
        email_service::Mailer,
        identity::{IdentityVerifier, VerifiedIdentity},
        qotd_service::QuestionBank,
        AppState,
    },
    store::MemoryStore,
    utils::time::{Clock, FixedClock},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};
use tower::ServiceExt;

pub const PASSWORD: &str = "stoichiometry";

/// Noon in New York on 2025-01-04.
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 4, 17, 0, 0).unwrap()
}

/// Records verification links instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn token_for(&self, email: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .and_then(|(_, link)| link.split("token=").nth(1).map(str::to_string))
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_email(
        &self,
        recipient_email: &str,
        verify_url: &str,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient_email.to_string(), verify_url.to_string()));
        Ok(())
    }
}

/// Accepts tokens shaped `google:{subject}:{email}`.
pub struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity> {
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("google"), Some(subject), Some(email)) => Ok(VerifiedIdentity {
                subject: subject.to_string(),
                email: Some(email.to_string()),
                email_verified: true,
            }),
            _ => Err(HubError::Unauthorized("Invalid Google ID token".to_string()).into()),
        }
    }
}

pub fn test_questions() -> QuestionBank {
    let question = |text: &str, answers: [&str; 4], correct: u32| Question {
        question: text.to_string(),
        answers: answers.iter().map(|a| a.to_string()).collect(),
        correct,
        explanation: Some(format!("Because {}", answers[correct as usize])),
    };
    QuestionBank::new(vec![
        question("Symbol for sodium?", ["Na", "S", "So", "N"], 0),
        question("Charge of an electron?", ["+1", "0", "-1", "+2"], 2),
        question("pH of pure water at 25 C?", ["0", "7", "14", "1"], 1),
    ])
    .unwrap()
}

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://unused".to_string(),
        mongo_database: "chemhub_test".to_string(),
        redis_uri: "redis://unused".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        access_token_ttl_seconds: 3600,
        bcrypt_cost: 4,
        google_client_id: Some("test-client".to_string()),
        public_base_url: "http://localhost:8081/".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        smtp: None,
        site: SiteSettings {
            season_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            exam_date: NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
            ..SiteSettings::default()
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<FixedClock>,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    next_ip: AtomicU32,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let clock = Arc::new(FixedClock::new(start_instant()));
    let mailer = Arc::new(RecordingMailer::default());
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());

    let state = AppState::from_parts(
        config,
        store.clone(),
        cache.clone(),
        test_questions(),
        clock.clone(),
        Arc::new(StubVerifier),
        mailer.clone(),
    );

    TestApp {
        router: create_router(Arc::new(state)),
        clock,
        mailer,
        store,
        cache,
        next_ip: AtomicU32::new(1),
    }
}

impl TestApp {
    /// Distinct client address so per-IP auth rate limits stay out of the way.
    pub fn fresh_ip(&self) -> String {
        let n = self.next_ip.fetch_add(1, Ordering::SeqCst);
        format!("10.0.{}.{}", n / 256, n % 256)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None, &[]).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body), &[]).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.request(Method::PUT, uri, token, body, &[]).await
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        let ip = self.fresh_ip();
        self.request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            &[("x-forwarded-for", ip.as_str())],
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        let ip = self.fresh_ip();
        self.request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
            &[("x-forwarded-for", ip.as_str())],
        )
        .await
    }

    /// Registers, verifies and logs in; returns the access token.
    pub async fn signed_in_user(&self, email: &str) -> String {
        let registered = self.register(email).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);

        let token = self.mailer.token_for(email).expect("verification mail");
        let verified = self
            .post(
                "/api/v1/auth/verify-email",
                None,
                serde_json::json!({ "token": token }),
            )
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{:?}", verified.body);

        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.body["access_token"].as_str().unwrap().to_string()
    }

    /// Signed-in user who has also picked a username.
    pub async fn named_user(&self, email: &str, username: &str) -> String {
        let token = self.signed_in_user(email).await;
        let claimed = self
            .put(
                "/api/v1/account/username",
                Some(&token),
                Some(serde_json::json!({ "username": username })),
            )
            .await;
        assert_eq!(claimed.status, StatusCode::OK, "{:?}", claimed.body);
        token
    }

    pub fn advance_days(&self, days: i64) {
        self.clock.set(self.clock.now() + chrono::Duration::days(days));
    }
}
