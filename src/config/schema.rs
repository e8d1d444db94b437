//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the slug proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public origin).
    pub listener: ListenerConfig,

    /// Mapping store connection settings.
    pub store: StoreConfig,

    /// Outbound backend call settings.
    pub upstream: UpstreamConfig,

    /// Sliding-window rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// HTML rewrite pipeline settings.
    pub rewrite: RewriteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Deployment mode settings.
    pub runtime: RuntimeConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Public origin the proxy is served from (e.g., "https://proxy.example").
    /// When unset, the origin is derived per request from the Host and
    /// X-Forwarded-* headers.
    pub public_base_url: Option<String>,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_base_url: None,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Mapping store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store connection URL (e.g., "redis://127.0.0.1:6379").
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Outbound backend call settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Total request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// User-Agent sent when the client supplied none.
    pub user_agent: String,

    /// Fixed suffix terminating every mapped backend base URL. Stripped
    /// when building sub-path targets.
    pub entry_suffix: String,

    /// Maximum redirects followed transparently.
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            user_agent: "slug-proxy/0.1".to_string(),
            entry_suffix: "/exec".to_string(),
            max_redirects: 10,
        }
    }
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control.
    pub enabled: bool,

    /// Maximum requests per client within the window.
    pub limit: u64,

    /// Window length in seconds. Also used as the idle TTL of each
    /// client's timestamp set.
    pub window_secs: u64,

    /// Key prefix separating this limiter from others sharing the store.
    pub prefix: String,

    /// Trust `X-Forwarded-For` for client identity. Enable only behind an
    /// edge that overwrites the header; a directly exposed proxy must key
    /// on the socket peer, or clients rotate the header past the limit.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 60,
            window_secs: 60,
            prefix: "proxy".to_string(),
            trust_forwarded_for: false,
        }
    }
}

/// HTML rewrite pipeline settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Name of the backend platform's client-side bootstrap function.
    /// Direct calls to it are wrapped in the deferral guard.
    pub bootstrap_fn: String,

    /// Retry attempts of the bootstrap deferral guard.
    pub boot_retries: u32,

    /// Delay between bootstrap retries in milliseconds.
    pub boot_delay_ms: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            bootstrap_fn: "wardenInit".to_string(),
            boot_retries: 20,
            boot_delay_ms: 250,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Deployment mode settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Production mode suppresses error detail in 500 responses.
    pub production: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { production: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.rate_limit.limit, 60);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.upstream.entry_suffix, "/exec");
        assert!(config.runtime.production);
    }

    #[test]
    fn test_partial_toml_overlays_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [rate_limit]
            limit = 10

            [runtime]
            production = false
            "#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.limit, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(!config.runtime.production);
    }
}
