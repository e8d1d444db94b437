//! Multi-tenant slug proxy.
//!
//! Serves registered web apps under short public paths. A request for
//! `/{slug}[/{subpath}]` is resolved against a shared mapping store,
//! forwarded to the tenant's backend URL, and the response is rewritten
//! so pages authored for the backend's own origin keep working behind
//! the proxy.
//!
//! ```text
//!   Client ── /{slug}/… ──▶ http ──▶ routing ──▶ upstream ──▶ Backend
//!                            │          │
//!                            │       security (sliding-window limiter)
//!                            │          │
//!                            ◀── rewrite ◀──────── response
//!
//!   store: shared key-value mappings, counters, rate windows
//! ```
//!
//! The proxy never owns the mapping data; registration and stats are
//! separate collaborators writing to the same store.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod store;
pub mod upstream;

// Cross-cutting concerns
pub mod rewrite;
pub mod security;

pub use config::ProxyConfig;
pub use error::{ProxyError, ProxyResult, StoreError};
pub use http::HttpServer;
