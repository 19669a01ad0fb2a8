use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::env;

use crate::services::streak::StreakPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub jwt_secret: String,
    pub access_token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub google_client_id: Option<String>,
    pub public_base_url: String,
    pub bind_addr: String,
    pub smtp: Option<SmtpSettings>,
    pub site: SiteSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "AP Chem Study Hub".to_string()
}

/// Site-wide knobs for the study hub features.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Civil time zone that decides what "today" means for the daily question.
    pub time_zone: Tz,
    pub season_start: NaiveDate,
    pub questions_path: String,
    pub free_click_limit: u32,
    pub final_quiz_pass_percent: f64,
    pub leaderboard_size: usize,
    pub exam_date: NaiveDate,
    pub streak_policy: StreakPolicy,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::America::New_York,
            season_start: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap_or_default(),
            questions_path: "data/questions.json".to_string(),
            free_click_limit: 3,
            final_quiz_pass_percent: 80.0,
            leaderboard_size: 15,
            exam_date: NaiveDate::from_ymd_opt(2026, 5, 5).unwrap_or_default(),
            streak_policy: StreakPolicy::RequireToday,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__ overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "chemhub".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| {
                let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
                let port = env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                format!("redis://{}:{}/0", host, port)
            });

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            Err(_) => {
                tracing::warn!("Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            }
        };

        let access_token_ttl_seconds = settings
            .get_int("auth.access_token_ttl_seconds")
            .ok()
            .or_else(|| {
                env::var("JWT_ACCESS_TOKEN_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok())
            })
            .unwrap_or(3600);

        let bcrypt_cost = settings
            .get_int("auth.bcrypt_cost")
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        let google_client_id = settings
            .get_string("auth.google_client_id")
            .or_else(|_| env::var("GOOGLE_CLIENT_ID"))
            .ok()
            .filter(|id| !id.trim().is_empty());

        let public_base_url = settings
            .get_string("server.public_base_url")
            .or_else(|_| env::var("PUBLIC_BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let smtp = settings.get::<SmtpSettings>("smtp").ok();

        let site = load_site_settings(&settings)?;

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            access_token_ttl_seconds,
            bcrypt_cost,
            google_client_id,
            public_base_url,
            bind_addr,
            smtp,
            site,
        })
    }
}

fn load_site_settings(settings: &config::Config) -> Result<SiteSettings, config::ConfigError> {
    let defaults = SiteSettings::default();

    let time_zone = match settings.get_string("site.time_zone") {
        Ok(name) => name.parse::<Tz>().map_err(|e| {
            config::ConfigError::Message(format!("Invalid site.time_zone '{}': {}", name, e))
        })?,
        Err(_) => defaults.time_zone,
    };

    let season_start = match settings.get_string("site.season_start") {
        Ok(raw) => parse_date("site.season_start", &raw)?,
        Err(_) => defaults.season_start,
    };

    let exam_date = match settings.get_string("site.exam_date") {
        Ok(raw) => parse_date("site.exam_date", &raw)?,
        Err(_) => defaults.exam_date,
    };

    let streak_policy = match settings.get_string("site.streak_policy") {
        Ok(raw) => raw
            .parse::<StreakPolicy>()
            .map_err(config::ConfigError::Message)?,
        Err(_) => defaults.streak_policy,
    };

    let free_click_limit = settings
        .get_int("site.free_click_limit")
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(defaults.free_click_limit);

    let leaderboard_size = settings
        .get_int("site.leaderboard_size")
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(defaults.leaderboard_size);

    Ok(SiteSettings {
        time_zone,
        season_start,
        questions_path: settings
            .get_string("site.questions_path")
            .unwrap_or(defaults.questions_path),
        free_click_limit,
        final_quiz_pass_percent: settings
            .get_float("site.final_quiz_pass_percent")
            .unwrap_or(defaults.final_quiz_pass_percent),
        leaderboard_size,
        exam_date,
        streak_policy,
    })
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate, config::ConfigError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        config::ConfigError::Message(format!("Invalid {} '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_site_settings_match_published_calendar() {
        let site = SiteSettings::default();
        assert_eq!(site.time_zone, chrono_tz::America::New_York);
        assert_eq!(site.free_click_limit, 3);
        assert_eq!(site.leaderboard_size, 15);
        assert_eq!(site.exam_date.to_string(), "2026-05-05");
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("site.exam_date", "May 5, 2026").is_err());
        assert!(parse_date("site.exam_date", "2026-05-05").is_ok());
    }
}
