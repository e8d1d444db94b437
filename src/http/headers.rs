//! Response header policy.
//!
//! Upstream headers are mirrored with three exceptions:
//!
//! - transport headers describing the upstream encoding are dropped,
//!   because the body the proxy sends is re-encoded by its own stack
//! - the backend's Content-Security-Policy is dropped when the HTML
//!   pipeline injected script, which the backend's policy cannot know
//! - the proxy adds its own CORS and caching headers
//!
//! Everything else passes through so backend-set cookies, content types,
//! and custom headers keep working.

use axum::http::{header, HeaderMap, HeaderValue};

const DROPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "connection",
];

/// Cache policy for rewritten HTML: short shared cache with a
/// stale-while-revalidate grace period.
const CACHE_HTML: &str = "public, s-maxage=60, stale-while-revalidate=120";

/// Cache policy for fingerprinted static assets.
const CACHE_STATIC: &str = "public, max-age=31536000, immutable";

fn is_static_asset(content_type: &str) -> bool {
    content_type.contains("javascript") || content_type.contains("text/css")
}

/// Build the final client-facing header set from the upstream response.
pub fn finalize_response_headers(
    upstream: &HeaderMap,
    content_type: &str,
    html_rewritten: bool,
) -> HeaderMap {
    let mut out = HeaderMap::new();

    for (name, value) in upstream {
        let lower = name.as_str();
        if DROPPED_RESPONSE_HEADERS.contains(&lower) {
            continue;
        }
        if html_rewritten
            && (lower == "content-security-policy"
                || lower == "content-security-policy-report-only")
        {
            continue;
        }
        out.append(name.clone(), value.clone());
    }

    apply_cors(&mut out);

    let ct = content_type.to_ascii_lowercase();
    if ct.contains("text/html") {
        out.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_HTML));
    } else if is_static_asset(&ct) {
        out.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_STATIC));
    }

    out
}

/// The proxy's open CORS surface, also used for preflight responses.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
