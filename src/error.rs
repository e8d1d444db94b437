//! Error taxonomy for the proxy request path.

use thiserror::Error;

/// Errors raised by the mapping store client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed in transit.
    /// Surfaces as a 500-class failure, never as a 404.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value did not deserialize into the expected shape.
    #[error("stored value malformed: {0}")]
    Serde(#[from] serde_json::Error),

    /// Create-only write refused because the key is already present.
    #[error("key already exists: {0}")]
    AlreadyExists(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Errors that can abort an in-flight proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No mapping exists for the requested slug.
    #[error("no mapping for slug \"{slug}\"")]
    SlugNotFound { slug: String },

    /// The client exceeded its sliding-window allowance.
    #[error("rate limit exceeded")]
    RateLimited {
        limit: u64,
        remaining: u64,
        reset_secs: u64,
    },

    /// Store lookup failed for a reason other than a missing key.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The outbound backend call failed (network, timeout, connect).
    /// The whole request aborts as one unit; there is no retry.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The inbound body could not be read or exceeded the size limit.
    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Result alias used throughout the request path.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProxyError::SlugNotFound {
            slug: "missing-app".into(),
        };
        assert_eq!(err.to_string(), "no mapping for slug \"missing-app\"");

        let err = StoreError::Unavailable("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_store_error_converts_to_proxy_error() {
        let err: ProxyError = StoreError::AlreadyExists("slug:demo".into()).into();
        assert!(matches!(err, ProxyError::Store(StoreError::AlreadyExists(_))));
    }
}
