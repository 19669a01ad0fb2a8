use anyhow::Result;
use std::sync::Arc;

use crate::{
    cache::Cache,
    metrics::GATING_DECISIONS_TOTAL,
    models::gating::{ClickOutcome, GatingStatus},
};

/// Anonymous click counters live for a month of inactivity.
pub const CLICK_COUNTER_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy)]
pub struct GatePolicy {
    pub free_clicks: u32,
}

impl GatePolicy {
    pub fn is_gated(&self, signed_in: bool, clicks: u32) -> bool {
        !signed_in && clicks >= self.free_clicks
    }
}

pub struct GatingService {
    cache: Arc<dyn Cache>,
    policy: GatePolicy,
}

impl GatingService {
    pub fn new(cache: Arc<dyn Cache>, policy: GatePolicy) -> Self {
        Self { cache, policy }
    }

    fn counter_key(visitor_id: &str) -> String {
        format!("gating:clicks:{}", visitor_id)
    }

    async fn clicks(&self, visitor_id: &str) -> Result<u32> {
        let raw = self.cache.get(&Self::counter_key(visitor_id)).await?;
        Ok(raw.and_then(|value| value.parse::<u32>().ok()).unwrap_or(0))
    }

    pub async fn status(&self, visitor_id: &str, signed_in: bool) -> Result<GatingStatus> {
        let clicks = self.clicks(visitor_id).await?;
        Ok(GatingStatus {
            clicks,
            limit: self.policy.free_clicks,
            gated: self.policy.is_gated(signed_in, clicks),
            signed_in,
        })
    }

    /// Decides whether a content click goes through, counting it for anonymous visitors.
    pub async fn register_click(&self, visitor_id: &str, signed_in: bool) -> Result<ClickOutcome> {
        let limit = self.policy.free_clicks;

        if signed_in {
            GATING_DECISIONS_TOTAL
                .with_label_values(&["signed_in"])
                .inc();
            let clicks = self.clicks(visitor_id).await?;
            return Ok(ClickOutcome {
                allowed: true,
                show_signup_prompt: false,
                clicks,
                remaining: limit.saturating_sub(clicks),
            });
        }

        let clicks = self.clicks(visitor_id).await?;
        if self.policy.is_gated(false, clicks) {
            tracing::debug!("Visitor {} gated after {} clicks", visitor_id, clicks);
            GATING_DECISIONS_TOTAL.with_label_values(&["blocked"]).inc();
            return Ok(ClickOutcome {
                allowed: false,
                show_signup_prompt: true,
                clicks,
                remaining: 0,
            });
        }

        let counted = self
            .cache
            .incr_ex(&Self::counter_key(visitor_id), CLICK_COUNTER_TTL_SECONDS)
            .await?;
        let clicks = u32::try_from(counted).unwrap_or(u32::MAX);
        GATING_DECISIONS_TOTAL.with_label_values(&["allowed"]).inc();

        Ok(ClickOutcome {
            allowed: true,
            show_signup_prompt: self.policy.is_gated(false, clicks),
            clicks,
            remaining: limit.saturating_sub(clicks),
        })
    }

    /// Forgets the visitor's free clicks once they sign in.
    pub async fn reset(&self, visitor_id: &str) -> Result<()> {
        self.cache.delete(&Self::counter_key(visitor_id)).await
    }
}
