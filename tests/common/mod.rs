//! Shared utilities for integration testing.
//!
//! Spins up the real proxy on an ephemeral port over an in-memory store,
//! plus a capture backend that records every request it receives.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use tokio::net::TcpListener;

use slug_proxy::config::ProxyConfig;
use slug_proxy::http::HttpServer;
use slug_proxy::store::{KvStore, MemoryStore, SlugMapping};

/// One request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Canned response for one backend path.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl CannedResponse {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.to_string(),
        }
    }
}

#[derive(Clone)]
struct BackendState {
    routes: Arc<HashMap<String, CannedResponse>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A running capture backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn capture_handler(State(state): State<BackendState>, request: Request<Body>) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_else(|| path.clone());
    let headers = request.headers().clone();
    let body = to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path_and_query,
        headers,
        body,
    });

    let canned = state.routes.get(&path).cloned().unwrap_or(CannedResponse {
        status: 200,
        content_type: "text/plain",
        body: "ok".to_string(),
    });

    let mut response = Response::new(Body::from(canned.body));
    *response.status_mut() =
        StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static(canned.content_type));
    response
}

/// Start a capture backend serving the given path -> response table.
pub async fn start_backend(routes: Vec<(&str, CannedResponse)>) -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        routes: Arc::new(
            routes
                .into_iter()
                .map(|(path, response)| (path.to_string(), response))
                .collect(),
        ),
        requests: requests.clone(),
    };

    let app = Router::new().fallback(capture_handler).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, requests }
}

/// A mapping whose backend base points at the mock backend's entry URL.
pub fn mapping_for(slug: &str, backend: SocketAddr) -> SlugMapping {
    SlugMapping {
        slug: slug.to_string(),
        backend_base_url: format!("http://{}/app/123/exec", backend),
        app_name: "Test App".to_string(),
        created_at: Utc::now(),
        access_count: 0,
    }
}

/// Test-friendly configuration: no rate limiting unless asked for, and a
/// fixed public origin so rewritten output is deterministic.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.public_base_url = Some("https://proxy.test".to_string());
    config.rate_limit.enabled = false;
    config.runtime.production = true;
    config
}

/// Start the proxy on an ephemeral port over the given store.
pub async fn start_proxy(config: ProxyConfig, store: Arc<dyn KvStore>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, store).unwrap();
    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });
    addr
}

/// One-call setup: backend, store with one mapping, running proxy.
pub async fn start_stack(
    slug: &str,
    routes: Vec<(&str, CannedResponse)>,
    config: ProxyConfig,
) -> (MockBackend, Arc<MemoryStore>, SocketAddr) {
    let backend = start_backend(routes).await;
    let store = Arc::new(MemoryStore::new());
    store
        .put_mapping(&mapping_for(slug, backend.addr))
        .await
        .unwrap();
    let proxy = start_proxy(config, store.clone()).await;
    (backend, store, proxy)
}
