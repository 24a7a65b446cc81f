//! Mock API server - scripted IndustryDB endpoints on a local port

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use industrydb_common::ApiConfig;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

pub const SEARCH_PATH: &str = "/api/v1/leads/search";
pub const PREVIEW_PATH: &str = "/api/v1/leads/preview";
pub const USAGE_PATH: &str = "/api/v1/usage";

/// Scripted endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Preview,
    Usage,
}

/// One canned response
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: Value,
    pub delay: Duration,
    pub headers: Vec<(String, String)>,
}

impl MockReply {
    pub fn ok(body: Value) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            headers: Vec::new(),
        }
    }

    /// Respond only after `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.body)).into_response();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => warn!("Skipping invalid mock header {}", name),
            }
        }
        response
    }
}

/// What the server saw
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub search_queries: Vec<HashMap<String, String>>,
    pub preview_bodies: Vec<Value>,
    pub authorization: Vec<Option<String>>,
}

#[derive(Default)]
struct Script {
    queued: HashMap<Endpoint, VecDeque<MockReply>>,
    fallback: HashMap<Endpoint, MockReply>,
    hits: HashMap<Endpoint, usize>,
    recorded: Recorded,
}

impl Script {
    fn next(&mut self, endpoint: Endpoint, authorization: Option<String>) -> MockReply {
        *self.hits.entry(endpoint).or_default() += 1;
        self.recorded.authorization.push(authorization);
        self.queued
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.fallback.get(&endpoint).cloned())
            .unwrap_or_else(|| default_reply(endpoint))
    }
}

type Shared = Arc<Mutex<Script>>;

fn default_reply(endpoint: Endpoint) -> MockReply {
    match endpoint {
        Endpoint::Search => MockReply::ok(leads_page(&[], 1, 0, 20)),
        Endpoint::Preview => MockReply::ok(json!({ "estimated_count": 0 })),
        Endpoint::Usage => MockReply::ok(usage_body(0, 100, "free")),
    }
}

/// Search response body with `ids` as leads on page `page`
pub fn leads_page(ids: &[i64], page: u32, total: u64, limit: u32) -> Value {
    let total_pages = total.div_ceil(u64::from(limit.max(1))) as u32;
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "company_name": format!("Company {}", id),
                "industry": "dental",
                "country": "DE",
                "city": "Berlin",
                "email": format!("info@company{}.example", id),
                "verified": id % 2 == 0,
            })
        })
        .collect();
    json!({
        "items": items,
        "pagination": {
            "total": total,
            "total_pages": total_pages,
            "has_next": page < total_pages,
            "has_prev": page > 1,
        }
    })
}

/// Usage response body
pub fn usage_body(used: u64, limit: u64, tier: &str) -> Value {
    json!({
        "current_usage": used,
        "usage_limit": limit,
        "remaining": limit.saturating_sub(used),
        "tier": tier,
    })
}

/// Error response body in the API's shape
pub fn error_body(message: &str) -> Value {
    json!({ "error": "error", "message": message })
}

/// Configuration for starting the mock server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (0 = any free port)
    pub port: u16,

    /// Timeout for server startup
    pub startup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            startup_timeout: Duration::from_secs(10),
        }
    }
}

/// Handle to a running mock API
pub struct MockApiServer {
    script: Shared,
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockApiServer {
    /// Start on a free local port with default settings
    pub async fn start() -> E2eResult<Self> {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> E2eResult<Self> {
        let script: Shared = Arc::default();
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route(SEARCH_PATH, get(search))
            .route(PREVIEW_PATH, post(preview))
            .route(USAGE_PATH, get(usage))
            .with_state(script.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], config.port)))
            .await
            .map_err(|e| E2eError::ServerStartup(format!("bind failed: {}", e)))?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{}", addr);

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                warn!("Mock API stopped with error: {}", e);
            }
        });

        let handle = Self {
            script,
            base_url,
            shutdown: Some(tx),
        };
        handle.wait_for_healthy(config.startup_timeout).await?;

        info!("Mock API listening at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => warn!("Health check returned {}", resp.status()),
                Err(e) if !e.is_connect() => warn!("Health check error: {}", e),
                Err(_) => {}
            }

            sleep(Duration::from_millis(20)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client settings pointing at this server
    pub fn api_config(&self, token: Option<&str>) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            token: token.map(str::to_string),
            timeout_secs: 5,
        }
    }

    /// Queue a reply for the next request to `endpoint`
    pub fn enqueue(&self, endpoint: Endpoint, reply: MockReply) {
        self.script
            .lock()
            .queued
            .entry(endpoint)
            .or_default()
            .push_back(reply);
    }

    /// Reply used once the queue for `endpoint` is empty
    pub fn set_fallback(&self, endpoint: Endpoint, reply: MockReply) {
        self.script.lock().fallback.insert(endpoint, reply);
    }

    pub fn hits(&self, endpoint: Endpoint) -> usize {
        self.script.lock().hits.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn recorded(&self) -> Recorded {
        self.script.lock().recorded.clone()
    }

    /// Poll until `endpoint` was hit at least `count` times
    pub async fn wait_for_hits(
        &self,
        endpoint: Endpoint,
        count: usize,
        timeout: Duration,
    ) -> E2eResult<()> {
        let start = Instant::now();
        while self.hits(endpoint) < count {
            if start.elapsed() > timeout {
                return Err(E2eError::Timeout(format!(
                    "{:?} hit {} of {} times",
                    endpoint,
                    self.hits(endpoint),
                    count
                )));
            }
            sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            debug!("Stopping mock API at {}", self.base_url);
            let _ = tx.send(());
        }
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn respond(reply: MockReply) -> Response {
    if !reply.delay.is_zero() {
        sleep(reply.delay).await;
    }
    reply.into_response()
}

async fn search(
    State(script): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let reply = {
        let mut script = script.lock();
        script.recorded.search_queries.push(query);
        script.next(Endpoint::Search, bearer(&headers))
    };
    respond(reply).await
}

async fn preview(
    State(script): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let reply = {
        let mut script = script.lock();
        script.recorded.preview_bodies.push(body);
        script.next(Endpoint::Preview, bearer(&headers))
    };
    respond(reply).await
}

async fn usage(State(script): State<Shared>, headers: HeaderMap) -> Response {
    let reply = script.lock().next(Endpoint::Usage, bearer(&headers));
    respond(reply).await
}
