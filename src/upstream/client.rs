//! Request forwarding to the mapped backend.
//!
//! One outbound call per inbound request: no retries, so non-idempotent
//! methods never produce duplicate side effects. Redirects are followed
//! transparently up to the configured limit. A network or timeout
//! failure aborts the whole request as one unit.

use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use url::Url;

use crate::config::UpstreamConfig;

/// Hop-by-hop headers that must not travel past a proxy hop.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "transfer-encoding",
    "host",
    "keep-alive",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
];

/// Headers that would reveal the proxy's own infrastructure to the backend.
const INFRASTRUCTURE: &[&str] = &[
    "forwarded",
    "via",
    "cdn-loop",
    "x-real-ip",
    "x-request-id",
];

fn is_dropped(name: &str) -> bool {
    HOP_BY_HOP.contains(&name)
        || INFRASTRUCTURE.contains(&name)
        // Compression is negotiated per hop. The client's list (br, zstd)
        // may exceed what this side can decode; the outbound client sends
        // its own Accept-Encoding so every body it hands to the rewriter
        // is already decoded.
        || name == "accept-encoding"
        || name.starts_with("x-forwarded-")
}

/// Build the outbound header set from the client's headers.
///
/// Everything survives except hop-by-hop and infrastructure headers;
/// `Origin` and `Referer` are then pinned to the backend's own entry URL
/// so its same-origin checks pass.
pub fn sanitize_request_headers(
    inbound: &HeaderMap,
    entry_url: &str,
    default_user_agent: &str,
) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in inbound {
        if is_dropped(name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    if let Ok(value) = HeaderValue::from_str(entry_url) {
        out.insert(header::REFERER, value);
    }
    if let Ok(url) = Url::parse(entry_url) {
        let origin = url.origin().ascii_serialization();
        if let Ok(value) = HeaderValue::from_str(&origin) {
            out.insert(header::ORIGIN, value);
        }
    }

    if !out.contains_key(header::USER_AGENT) {
        if let Ok(value) = HeaderValue::from_str(default_user_agent) {
            out.insert(header::USER_AGENT, value);
        }
    }

    out
}

/// Forwarding client for backend calls.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { http })
    }

    /// Issue the backend call. Body bytes are forwarded unchanged.
    pub async fn forward(
        &self,
        method: Method,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .request(method, target)
            .headers(headers)
            .body(body)
            .send()
            .await
    }
}
