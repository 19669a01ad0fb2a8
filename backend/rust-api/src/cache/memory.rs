use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Cache;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache honoring TTLs, used by tests and single-node demos.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("memory cache lock poisoned"))?;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
                },
            );
        })
    }

    async fn incr_ex(&self, key: &str, ttl_seconds: u64) -> Result<u64> {
        self.with_entries(|entries| {
            let current = entries
                .get(key)
                .and_then(|entry| entry.value.parse::<u64>().ok())
                .unwrap_or(0);
            let next = current + 1;
            entries.insert(
                key.to_string(),
                Entry {
                    value: next.to_string(),
                    expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
                },
            );
            next
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    async fn hit_window(&self, key: &str, limit: u32, window_seconds: u64) -> Result<bool> {
        self.with_entries(|entries| match entries.get_mut(key) {
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Instant::now() + Duration::from_secs(window_seconds),
                    },
                );
                true
            }
            Some(entry) => {
                let current = entry.value.parse::<u32>().unwrap_or(0);
                if current >= limit {
                    false
                } else {
                    entry.value = (current + 1).to_string();
                    true
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counters_increment_and_reset() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr_ex("gating:clicks:v1", 60).await.unwrap(), 1);
        assert_eq!(cache.incr_ex("gating:clicks:v1", 60).await.unwrap(), 2);
        cache.delete("gating:clicks:v1").await.unwrap();
        assert_eq!(cache.get("gating:clicks:v1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_values_disappear() {
        let cache = MemoryCache::new();
        cache.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn window_blocks_after_limit() {
        let cache = MemoryCache::new();
        for _ in 0..3 {
            assert!(cache.hit_window("ratelimit:login:1.2.3.4", 3, 60).await.unwrap());
        }
        assert!(!cache.hit_window("ratelimit:login:1.2.3.4", 3, 60).await.unwrap());
        assert!(cache.hit_window("ratelimit:login:5.6.7.8", 3, 60).await.unwrap());
    }
}
