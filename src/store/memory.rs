//! In-memory implementation of the store interface.
//!
//! Backs tests and local development. Windows honor the same TTL and
//! pruning rules as the Redis implementation; per-key atomicity comes
//! from the map's entry lock.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::store::{counter_key, mapping_key, KvStore, SlugMapping, WindowSample};

#[derive(Debug, Default)]
struct Window {
    /// Member timestamps in insertion order (scores are monotonic per client).
    members: Vec<i64>,
    /// Absolute expiry; an idle window past this point is discarded whole.
    expires_at_ms: i64,
}

/// Store kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    counters: DashMap<String, i64>,
    windows: DashMap<String, Window>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get_mapping(&self, slug: &str) -> Result<Option<SlugMapping>, StoreError> {
        match self.values.get(&mapping_key(slug)) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_mapping(&self, mapping: &SlugMapping) -> Result<(), StoreError> {
        let key = mapping_key(&mapping.slug);
        if self.values.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key));
        }
        let json = serde_json::to_string(mapping)?;
        self.values.insert(key, json);
        self.counters.entry(counter_key(&mapping.slug)).or_insert(0);
        Ok(())
    }

    async fn incr_counter(&self, key: &str) -> Result<i64, StoreError> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn record_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<WindowSample, StoreError> {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        let window = entry.value_mut();

        if window.expires_at_ms != 0 && now_ms >= window.expires_at_ms {
            window.members.clear();
        }

        window.members.push(now_ms);
        let cutoff = now_ms - window_ms;
        window.members.retain(|&ts| ts >= cutoff);
        window.expires_at_ms = now_ms + window_ms;

        Ok(WindowSample {
            count: window.members.len() as u64,
            oldest_ms: window.members.iter().min().copied(),
        })
    }
}
