//! Sliding-window rate limiting over the mapping store.
//!
//! Each admission check performs one atomic store round trip: record the
//! current timestamp, prune everything older than the window, count what
//! remains, refresh the set's TTL. Pruning happens on every check; there
//! is no separate cleanup schedule. The boundary is inclusive: the
//! request that brings the count to exactly `limit` is still admitted.

use std::sync::Arc;

use chrono::Utc;

use crate::config::RateLimitConfig;
use crate::error::StoreError;
use crate::store::{window_key, KvStore};

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    /// Seconds until the oldest counted request leaves the window.
    pub reset_secs: u64,
}

/// Per-client sliding-window admission control.
pub struct SlidingWindowLimiter {
    store: Arc<dyn KvStore>,
    limit: u64,
    window_secs: u64,
    prefix: String,
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn KvStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.limit,
            window_secs: config.window_secs,
            prefix: config.prefix.clone(),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Check and record one request from `client_id`.
    pub async fn admit(&self, client_id: &str) -> Result<Decision, StoreError> {
        self.admit_at(client_id, Utc::now().timestamp_millis()).await
    }

    /// Admission check at an explicit clock, for tests.
    pub async fn admit_at(&self, client_id: &str, now_ms: i64) -> Result<Decision, StoreError> {
        let window_ms = self.window_secs as i64 * 1000;
        let key = window_key(&self.prefix, client_id);

        let sample = self.store.record_window(&key, now_ms, window_ms).await?;

        let allowed = sample.count <= self.limit;
        let remaining = self.limit.saturating_sub(sample.count);
        let reset_secs = sample
            .oldest_ms
            .map(|oldest| {
                let left_ms = oldest + window_ms - now_ms;
                if left_ms <= 0 {
                    0
                } else {
                    // Round up to whole seconds.
                    ((left_ms + 999) / 1000) as u64
                }
            })
            .unwrap_or(0);

        if !allowed {
            tracing::warn!(
                client = %client_id,
                count = sample.count,
                limit = self.limit,
                reset_secs,
                "Rate limit exceeded"
            );
        }

        Ok(Decision {
            allowed,
            remaining,
            reset_secs,
        })
    }
}
