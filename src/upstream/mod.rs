//! Outbound leg: target URL construction and request forwarding.

pub mod client;
pub mod target;

pub use client::{sanitize_request_headers, UpstreamClient};
pub use target::{build_target_url, filter_query, strip_entry_suffix};
