//! HTTP server setup and the proxy request path.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all slug handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Resolve slug -> mapping, enforce admission, forward upstream
//! - Rewrite the response and apply the outgoing header policy

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::{errors, headers::{apply_cors, finalize_response_headers}};
use crate::rewrite::{self, RewriteContext};
use crate::routing::SlugResolver;
use crate::security::SlidingWindowLimiter;
use crate::store::{counter_key, KvStore};
use crate::upstream::{build_target_url, filter_query, sanitize_request_headers, UpstreamClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub resolver: SlugResolver,
    pub limiter: Option<Arc<SlidingWindowLimiter>>,
    pub client: UpstreamClient,
    pub config: Arc<ProxyConfig>,
}

/// HTTP server for the slug proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server over the given mapping store.
    pub fn new(config: ProxyConfig, store: Arc<dyn KvStore>) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);

        let limiter = if config.rate_limit.enabled {
            Some(Arc::new(SlidingWindowLimiter::new(
                store.clone(),
                &config.rate_limit,
            )))
        } else {
            None
        };

        let state = AppState {
            resolver: SlugResolver::new(store.clone()),
            store,
            limiter,
            client: UpstreamClient::new(&config.upstream)?,
            config: config.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Ensure every request carries an ID for log correlation. The ID is
/// internal: the upstream header policy strips it again on the way out.
async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    if !request.headers().contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            request.headers_mut().insert("x-request-id", value);
        }
    }
    next.run(request).await
}

/// The proxy origin as the client sees it. An explicitly configured
/// public base URL wins; otherwise it is reconstructed from forwarding
/// headers, defaulting to https unless the edge says plain http.
pub fn resolve_public_origin(config: &ProxyConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.listener.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&config.listener.bind_address);

    let proto = match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some("http") => "http",
        _ => "https",
    };

    format!("{}://{}", proto, host)
}

/// The identity the limiter keys on. `X-Forwarded-For` is client-supplied
/// and only honored when the deployment declares a trusted edge in front;
/// otherwise the socket peer is the identity.
fn client_id(headers: &HeaderMap, addr: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
        {
            return forwarded.trim().to_string();
        }
    }
    addr.ip().to_string()
}

/// Main proxy handler: resolve, admit, forward, rewrite.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    // Preflight never reaches the backend.
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors(response.headers_mut());
        return response;
    }

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    match handle_request(&state, addr, request).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::SlugNotFound { slug } => {
                    tracing::warn!(request_id = %request_id, slug = %slug, "Unknown slug")
                }
                ProxyError::RateLimited { reset_secs, .. } => {
                    tracing::warn!(request_id = %request_id, reset_secs, "Request rejected")
                }
                other => {
                    tracing::error!(request_id = %request_id, error = %other, "Request failed")
                }
            }
            errors::error_response(&err, !state.config.runtime.production)
        }
    }
}

async fn handle_request(
    state: &AppState,
    addr: SocketAddr,
    request: Request<Body>,
) -> ProxyResult<Response> {
    let path = request.uri().path().to_string();
    let query = filter_query(request.uri().query());
    let method = request.method().clone();

    // Admission before any store lookup or upstream work. A limiter
    // whose backing store is down fails open: availability of mapped
    // apps outranks strict accounting.
    if let Some(limiter) = &state.limiter {
        let client = client_id(
            request.headers(),
            addr,
            state.config.rate_limit.trust_forwarded_for,
        );
        match limiter.admit(&client).await {
            Ok(decision) if !decision.allowed => {
                return Err(ProxyError::RateLimited {
                    limit: limiter.limit(),
                    remaining: decision.remaining,
                    reset_secs: decision.reset_secs,
                });
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Rate limiter unavailable, admitting request");
            }
        }
    }

    let route = state.resolver.resolve(&path).await?;

    tracing::debug!(
        slug = %route.slug,
        subpath = %route.subpath,
        method = %method,
        "Proxying request"
    );

    // Best-effort access accounting, off the request path.
    {
        let store = state.store.clone();
        let key = counter_key(&route.slug);
        let slug = route.slug.clone();
        tokio::spawn(async move {
            if let Err(err) = store.incr_counter(&key).await {
                tracing::debug!(slug = %slug, error = %err, "Access counter update failed");
            }
        });
    }

    let target = build_target_url(
        &route.mapping.backend_base_url,
        &state.config.upstream.entry_suffix,
        &route.subpath,
        query.as_deref(),
    );

    let proxy_origin = resolve_public_origin(&state.config, request.headers());
    let outbound_headers = sanitize_request_headers(
        request.headers(),
        &route.mapping.backend_base_url,
        &state.config.upstream.user_agent,
    );

    let body = axum::body::to_bytes(
        request.into_body(),
        state.config.listener.max_body_size,
    )
    .await
    .map_err(|err| ProxyError::Body(err.to_string()))?;

    let upstream = state
        .client
        .forward(method, &target, outbound_headers, body)
        .await?;

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let content_type = upstream_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let raw = upstream.bytes().await?;

    let ctx = RewriteContext::new(
        proxy_origin,
        &route.slug,
        &route.mapping.backend_base_url,
        &state.config.upstream.entry_suffix,
        &state.config.rewrite,
    );
    let (body, html_rewritten) = rewrite::transform(&content_type, raw, &ctx);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() =
        finalize_response_headers(&upstream_headers, &content_type, html_rewritten);

    Ok(response)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_base(base: Option<&str>) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.listener.public_base_url = base.map(str::to_string);
        config
    }

    #[test]
    fn test_configured_base_url_wins() {
        let config = config_with_base(Some("https://proxy.test/"));
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-host", HeaderValue::from_static("edge.test"));
        assert_eq!(resolve_public_origin(&config, &headers), "https://proxy.test");
    }

    #[test]
    fn test_forwarded_host_and_proto() {
        let config = config_with_base(None);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-host", HeaderValue::from_static("proxy.test"));
        assert_eq!(resolve_public_origin(&config, &headers), "https://proxy.test");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
        assert_eq!(resolve_public_origin(&config, &headers), "http://proxy.test");
    }

    #[test]
    fn test_host_header_fallback() {
        let config = config_with_base(None);
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("proxy.test:8080"));
        assert_eq!(
            resolve_public_origin(&config, &headers),
            "https://proxy.test:8080"
        );
    }

    #[test]
    fn test_client_id_uses_peer_by_default() {
        let addr: SocketAddr = "10.0.0.9:4444".parse().unwrap();

        // Without a declared trusted edge the header is attacker-supplied.
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_id(&headers, addr, false), "10.0.0.9");
    }

    #[test]
    fn test_client_id_behind_trusted_edge() {
        let addr: SocketAddr = "10.0.0.9:4444".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_id(&headers, addr, true), "203.0.113.7");

        // Trusted edge but no header: fall back to the peer.
        assert_eq!(client_id(&HeaderMap::new(), addr, true), "10.0.0.9");
    }
}
