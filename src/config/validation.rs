//! Configuration validation.
//!
//! Semantic validation on top of serde's syntactic checks. Returns all
//! errors, not just the first, so a broken config file can be fixed in
//! one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single validation failure, pointing at the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration. Pure function: collects every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a valid socket address: {}", config.listener.bind_address),
        });
    }

    if let Some(base) = &config.listener.public_base_url {
        if !base.starts_with("http://") && !base.starts_with("https://") {
            errors.push(ValidationError {
                field: "listener.public_base_url".into(),
                message: "must be an absolute http(s) URL".into(),
            });
        }
        if base.ends_with('/') {
            errors.push(ValidationError {
                field: "listener.public_base_url".into(),
                message: "must not carry a trailing slash".into(),
            });
        }
    }

    if config.listener.max_body_size == 0 {
        errors.push(ValidationError {
            field: "listener.max_body_size".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.store.url.is_empty() {
        errors.push(ValidationError {
            field: "store.url".into(),
            message: "must not be empty".into(),
        });
    }

    if !config.upstream.entry_suffix.starts_with('/') {
        errors.push(ValidationError {
            field: "upstream.entry_suffix".into(),
            message: "must start with '/'".into(),
        });
    }

    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "upstream.request_timeout_secs".into(),
            message: "must be greater than zero".into(),
        });
    }

    if config.rate_limit.enabled {
        if config.rate_limit.limit == 0 {
            errors.push(ValidationError {
                field: "rate_limit.limit".into(),
                message: "must be greater than zero when enabled".into(),
            });
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError {
                field: "rate_limit.window_secs".into(),
                message: "must be greater than zero when enabled".into(),
            });
        }
    }

    if config.rewrite.bootstrap_fn.is_empty() {
        errors.push(ValidationError {
            field: "rewrite.bootstrap_fn".into(),
            message: "must not be empty".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nonsense".into();
        config.upstream.entry_suffix = "exec".into();
        config.rate_limit.limit = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "listener.bind_address"));
        assert!(errors.iter().any(|e| e.field == "upstream.entry_suffix"));
        assert!(errors.iter().any(|e| e.field == "rate_limit.limit"));
    }

    #[test]
    fn test_public_base_url_checks() {
        let mut config = ProxyConfig::default();
        config.listener.public_base_url = Some("proxy.example".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "listener.public_base_url"));

        config.listener.public_base_url = Some("https://proxy.example/".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("trailing slash")));
    }
}
