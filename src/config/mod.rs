//! Configuration loading, schema, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ProxyConfig, RateLimitConfig, RewriteConfig,
    RuntimeConfig, StoreConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
