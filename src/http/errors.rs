//! Client-facing error responses.
//!
//! Three shapes: a browsable HTML page for unknown slugs, a JSON payload
//! with limit headers for rejected requests, and a JSON envelope for
//! everything that went wrong on the proxy's side. Internal detail only
//! leaks into the envelope outside production.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::error::ProxyError;

/// Minimal HTML entity escaping for values interpolated into markup.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The page shown for a slug with no mapping.
pub fn not_found_page(slug: &str) -> String {
    let slug = escape_html(slug);
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n<head><title>App Not Found</title></head>\n",
            "<body>\n<h1>App Not Found</h1>\n",
            "<p>No app is registered under <code>/{}</code>.</p>\n",
            "</body>\n</html>\n"
        ),
        slug
    )
}

/// Map a request-path failure to its client-facing response.
pub fn error_response(err: &ProxyError, expose_detail: bool) -> Response {
    match err {
        ProxyError::SlugNotFound { slug } => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
            not_found_page(slug),
        )
            .into_response(),

        ProxyError::RateLimited {
            limit,
            remaining,
            reset_secs,
        } => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Too many requests" })),
            )
                .into_response();
            let headers = response.headers_mut();
            insert_numeric(headers, "x-ratelimit-limit", *limit);
            insert_numeric(headers, "x-ratelimit-remaining", *remaining);
            insert_numeric(headers, "x-ratelimit-reset", *reset_secs);
            insert_numeric(headers, "retry-after", *reset_secs);
            response
        }

        other => {
            let message = if expose_detail {
                other.to_string()
            } else {
                "An internal error occurred".to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Proxy Error",
                    "message": message,
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

fn insert_numeric(headers: &mut axum::http::HeaderMap, name: &'static str, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}
