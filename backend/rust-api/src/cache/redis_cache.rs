use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::Cache;
use crate::metrics::track_cache_operation;

// Atomic check-and-increment; the first hit opens the window
const WINDOW_SCRIPT: &str = r#"
    local key = KEYS[1]
    local limit = tonumber(ARGV[1])
    local window = tonumber(ARGV[2])

    local current = redis.call('GET', key)

    if current == false then
        redis.call('SET', key, 1, 'EX', window)
        return 1
    end

    current = tonumber(current)

    if current >= limit then
        return 0
    end

    redis.call('INCR', key)
    return 1
"#;

pub struct RedisCache {
    redis: ConnectionManager,
}

impl RedisCache {
    /// Connects and verifies the server answers PING.
    pub async fn connect(redis_client: redis::Client) -> Result<Self> {
        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(redis_client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        let cache = Self { redis };
        tokio::time::timeout(std::time::Duration::from_secs(5), cache.ping())
            .await
            .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");
        Ok(cache)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        track_cache_operation("get", async {
            redis::cmd("GET")
                .arg(key)
                .query_async::<Option<String>>(&mut conn)
                .await
                .context("Redis GET failed")
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.redis.clone();
        track_cache_operation("set", async {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_seconds)
                .query_async::<()>(&mut conn)
                .await
                .context("Redis SET failed")
        })
        .await
    }

    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<u64> {
        let mut conn = self.redis.clone();
        track_cache_operation("incr", async {
            let (value,): (u64,) = redis::pipe()
                .atomic()
                .cmd("INCR")
                .arg(key)
                .cmd("EXPIRE")
                .arg(key)
                .arg(ttl_seconds)
                .ignore()
                .query_async(&mut conn)
                .await
                .context("Redis INCR failed")?;
            Ok(value)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.redis.clone();
        track_cache_operation("del", async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut conn)
                .await
                .context("Redis DEL failed")
        })
        .await
    }

    async fn hit_window(&self, key: &str, limit: u32, window_seconds: u64) -> Result<bool> {
        let mut conn = self.redis.clone();
        track_cache_operation("hit_window", async {
            let allowed: u32 = redis::Script::new(WINDOW_SCRIPT)
                .key(key)
                .arg(limit)
                .arg(window_seconds)
                .invoke_async(&mut conn)
                .await
                .context("Redis rate-limit script failed")?;
            Ok(allowed == 1)
        })
        .await
    }
}
