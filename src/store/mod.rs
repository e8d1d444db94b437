//! Mapping store client.
//!
//! The proxy consumes an external key-value store; it never owns it.
//! Key layout (fixed contract with the registration and stats
//! collaborators):
//!
//! - `slug:{slug}`            JSON-encoded [`SlugMapping`]
//! - `slug:{slug}:count`      independent integer access counter
//! - `ratelimit:{prefix}:{clientId}`  ordered set of request timestamps,
//!   TTL equal to the rate-limit window

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// One tenant binding: public slug to backend endpoint.
///
/// Serialized as camelCase JSON to match the records the registration
/// collaborator writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugMapping {
    /// Unique key, pattern `[a-z0-9-]+`. Uniqueness is enforced by the
    /// store at creation time.
    pub slug: String,

    /// Absolute HTTPS URL ending in the fixed entry suffix. Validated at
    /// creation, never at proxy time.
    pub backend_base_url: String,

    /// Human-readable tenant name.
    pub app_name: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Best-effort access counter carried inside the record.
    #[serde(default)]
    pub access_count: i64,
}

/// Result of the limiter's atomic window update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSample {
    /// Members remaining in the window after pruning, including the one
    /// just recorded.
    pub count: u64,

    /// Score of the oldest retained member, if any.
    pub oldest_ms: Option<i64>,
}

/// Store key for a slug mapping record.
pub fn mapping_key(slug: &str) -> String {
    format!("slug:{}", slug)
}

/// Store key for a slug's independent access counter.
pub fn counter_key(slug: &str) -> String {
    format!("slug:{}:count", slug)
}

/// Store key for a client's rate-limit window.
pub fn window_key(prefix: &str, client_id: &str) -> String {
    format!("ratelimit:{}:{}", prefix, client_id)
}

/// Read/write access to slug mappings, counters, and rate windows.
///
/// All operations except `record_window` are independent and tolerate
/// at-most-once semantics. `record_window` must execute its four steps
/// as a single indivisible batch against the store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Single keyed read of a mapping. `Ok(None)` means the slug is
    /// unmapped; transport failures are `Err`.
    async fn get_mapping(&self, slug: &str) -> Result<Option<SlugMapping>, StoreError>;

    /// Create-only write of a mapping, plus counter initialization.
    /// Fails with [`StoreError::AlreadyExists`] on a duplicate slug.
    async fn put_mapping(&self, mapping: &SlugMapping) -> Result<(), StoreError>;

    /// Increment an integer counter, returning the new value.
    async fn incr_counter(&self, key: &str) -> Result<i64, StoreError>;

    /// Atomic sliding-window update: record `now_ms` as a new member,
    /// prune members older than `now_ms - window_ms`, count the
    /// remainder, and refresh the set's TTL to the window length.
    async fn record_window(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> Result<WindowSample, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(mapping_key("my-app"), "slug:my-app");
        assert_eq!(counter_key("my-app"), "slug:my-app:count");
        assert_eq!(window_key("proxy", "10.0.0.1"), "ratelimit:proxy:10.0.0.1");
    }

    #[test]
    fn test_mapping_round_trips_camel_case() {
        let json = r#"{
            "slug": "my-app",
            "backendBaseUrl": "https://backend.example/app/123/exec",
            "appName": "My Test App",
            "createdAt": "2024-03-01T10:00:00Z",
            "accessCount": 7
        }"#;
        let mapping: SlugMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.slug, "my-app");
        assert_eq!(mapping.backend_base_url, "https://backend.example/app/123/exec");
        assert_eq!(mapping.access_count, 7);

        let out = serde_json::to_string(&mapping).unwrap();
        assert!(out.contains("backendBaseUrl"));
        assert!(out.contains("appName"));
        assert!(!out.contains("backend_base_url"));
    }

    #[test]
    fn test_access_count_defaults_to_zero() {
        let json = r#"{
            "slug": "my-app",
            "backendBaseUrl": "https://backend.example/app/123/exec",
            "appName": "My Test App",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let mapping: SlugMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.access_count, 0);
    }
}
