//! Response rewriting.
//!
//! Backend responses are transformed so that a page authored for the
//! backend's own origin keeps working when served through the proxy.
//! Dispatch is by declared content type:
//!
//! - `text/html`: the ordered pipeline in [`html`]
//! - `application/json`: pass-through after stripping the XSSI guard
//! - other `text/*` and binary types: pass-through
//!
//! The whole rewrite is computed into a fresh buffer. If decoding fails,
//! the original bytes are forwarded untouched and the failure is logged;
//! a half-rewritten body is never sent.

pub mod html;
pub mod shim;

use bytes::Bytes;

use crate::config::RewriteConfig;
use crate::upstream::strip_entry_suffix;

/// Anti-JSON-hijack marker some platforms prepend to JSON payloads.
pub const XSSI_GUARD: &str = ")]}'";

/// Per-request inputs for the HTML rewrite pipeline.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// Proxy origin as seen by the client, no trailing slash.
    pub proxy_origin: String,
    pub slug: String,
    /// Full backend base URL including the entry suffix.
    pub entry_url: String,
    /// Backend base with the entry suffix stripped.
    pub stripped_base: String,
    pub bootstrap_fn: String,
    pub boot_retries: u32,
    pub boot_delay_ms: u64,
}

impl RewriteContext {
    pub fn new(
        proxy_origin: String,
        slug: &str,
        backend_base_url: &str,
        entry_suffix: &str,
        config: &RewriteConfig,
    ) -> Self {
        Self {
            proxy_origin,
            slug: slug.to_string(),
            entry_url: backend_base_url.to_string(),
            stripped_base: strip_entry_suffix(backend_base_url, entry_suffix).to_string(),
            bootstrap_fn: config.bootstrap_fn.clone(),
            boot_retries: config.boot_retries,
            boot_delay_ms: config.boot_delay_ms,
        }
    }
}

/// Strip one leading XSSI guard (and its trailing newline) if present.
pub fn strip_xssi_guard(text: &str) -> &str {
    match text.strip_prefix(XSSI_GUARD) {
        Some(rest) => rest.strip_prefix('\n').unwrap_or(rest),
        None => text,
    }
}

/// Transform an upstream body. Returns the outgoing bytes and whether
/// the HTML pipeline ran (which decides CSP handling downstream).
pub fn transform(content_type: &str, raw: Bytes, ctx: &RewriteContext) -> (Bytes, bool) {
    let ct = content_type.to_ascii_lowercase();

    if ct.contains("text/html") {
        match std::str::from_utf8(&raw) {
            Ok(text) => {
                let rewritten = html::rewrite_document(text, ctx);
                return (Bytes::from(rewritten), true);
            }
            Err(err) => {
                tracing::warn!(
                    slug = %ctx.slug,
                    error = %err,
                    "HTML body is not valid UTF-8, forwarding unmodified"
                );
                return (raw, false);
            }
        }
    }

    if ct.contains("application/json") {
        if raw.starts_with(XSSI_GUARD.as_bytes()) {
            match std::str::from_utf8(&raw) {
                Ok(text) => return (Bytes::from(strip_xssi_guard(text).to_owned()), false),
                Err(err) => {
                    tracing::warn!(
                        slug = %ctx.slug,
                        error = %err,
                        "guarded JSON body is not valid UTF-8, forwarding unmodified"
                    );
                }
            }
        }
        return (raw, false);
    }

    // Other text types and binary payloads pass through unchanged.
    (raw, false)
}
