//! Short-lived keyed counters and values: gating clicks, the per-day attempt
//! cache and rate-limit windows.

use anyhow::Result;
use async_trait::async_trait;

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use redis_cache::RedisCache;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
    /// Increments the counter, refreshes its TTL and returns the new value.
    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<u64>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Fixed-window limiter. Returns false once `limit` hits landed in the window.
    async fn hit_window(&self, key: &str, limit: u32, window_seconds: u64) -> Result<bool>;
}
