use chrono::NaiveDate;
use mongodb::Client as MongoClient;
use std::sync::Arc;

use crate::{
    cache::{Cache, RedisCache},
    config::Config,
    middlewares::auth::JwtService,
    store::{DocumentStore, MongoStore},
    utils::time::{civil_date, Clock, SystemClock},
};

use self::{
    account_service::AccountService,
    auth_service::AuthService,
    email_service::{LogMailer, Mailer, SmtpMailer},
    gating_service::{GatePolicy, GatingService},
    identity::{GoogleTokenVerifier, IdentityVerifier},
    leaderboard_service::LeaderboardService,
    progress_service::ProgressService,
    qotd_service::{QotdService, QuestionBank},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn Cache>,
    pub questions: Arc<QuestionBank>,
    pub clock: Arc<dyn Clock>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Connects MongoDB and Redis and loads the question bank.
    pub async fn new(
        config: Config,
        mongo_client: MongoClient,
        redis_client: redis::Client,
    ) -> anyhow::Result<Self> {
        let mongo = MongoStore::new(mongo_client.database(&config.mongo_database));
        mongo.ensure_indexes().await?;

        tracing::info!("Attempting to connect to Redis...");
        let cache = RedisCache::connect(redis_client).await?;

        let questions = QuestionBank::load(&config.site.questions_path)?;
        let identity = GoogleTokenVerifier::new(config.google_client_id.clone())?;

        let mailer: Arc<dyn Mailer> = match config.smtp.clone() {
            Some(smtp) if !email_service::sending_disabled() => Arc::new(SmtpMailer::new(smtp)),
            _ => {
                tracing::warn!("SMTP not configured; verification links will only be logged");
                Arc::new(LogMailer)
            }
        };

        Ok(Self {
            config,
            store: Arc::new(mongo),
            cache: Arc::new(cache),
            questions: Arc::new(questions),
            clock: Arc::new(SystemClock),
            identity: Arc::new(identity),
            mailer,
        })
    }

    /// Assembles state from ready-made parts (in-memory backends, fixed clocks).
    pub fn from_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn Cache>,
        questions: QuestionBank,
        clock: Arc<dyn Clock>,
        identity: Arc<dyn IdentityVerifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            questions: Arc::new(questions),
            clock,
            identity,
            mailer,
        }
    }

    /// Today's civil date in the site's time zone.
    pub fn today(&self) -> NaiveDate {
        civil_date(self.clock.now(), self.config.site.time_zone)
    }

    pub fn jwt_service(&self) -> JwtService {
        JwtService::new(&self.config.jwt_secret)
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            self.store.clone(),
            self.mailer.clone(),
            self.identity.clone(),
            self.jwt_service(),
            self.config.access_token_ttl_seconds,
            self.config.public_base_url.clone(),
        )
        .with_bcrypt_cost(self.config.bcrypt_cost)
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(self.store.clone())
    }

    pub fn qotd_service(&self) -> QotdService {
        QotdService::new(
            self.store.clone(),
            self.cache.clone(),
            self.questions.clone(),
            self.clock.clone(),
            self.config.site.clone(),
        )
    }

    pub fn progress_service(&self) -> ProgressService {
        ProgressService::new(self.store.clone(), self.config.site.final_quiz_pass_percent)
    }

    pub fn leaderboard_service(&self) -> LeaderboardService {
        LeaderboardService::new(
            self.store.clone(),
            self.config.site.leaderboard_size,
            self.config.site.streak_policy,
        )
    }

    pub fn gating_service(&self) -> GatingService {
        GatingService::new(
            self.cache.clone(),
            GatePolicy {
                free_clicks: self.config.site.free_click_limit,
            },
        )
    }
}

pub mod account_service;
pub mod auth_service;
pub mod calculator;
pub mod email_service;
pub mod gating_service;
pub mod identity;
pub mod leaderboard_service;
pub mod progress_service;
pub mod qotd_service;
pub mod site_service;
pub mod streak;
