//! HTTP layer: server wiring, the proxy handler, and the client-facing
//! header and error policies.

pub mod errors;
pub mod headers;
pub mod server;

pub use server::{AppState, HttpServer};
