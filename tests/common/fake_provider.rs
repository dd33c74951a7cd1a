//! Fake sports-data provider for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1. Serves `GET /nfl/v1/{resource}?per_page=N[&cursor=C]` from
//! pages registered per `(resource, cursor)`, and can be told to answer with
//! an error status a fixed number of times first.
//!
//! # Example
//!
//! ```rust,no_run
//! # tokio_test::block_on(async {
//! use common::fake_provider::FakeProvider;
//!
//! let api = FakeProvider::start().await.unwrap();
//! api.serve("teams", None, teams_envelope()).await;
//! api.fail_times("teams", None, 503, 2).await;
//!
//! // Point HttpFeedClient at api.base_url()
//! # });
//! ```

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

type Key = (String, Option<String>);

/// One request as the provider saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub resource: String,
    pub cursor: Option<String>,
    pub per_page: Option<u32>,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
struct Failure {
    status: u16,
    retry_after: Option<u64>,
}

/// State shared between the router and test code.
#[derive(Default)]
struct ProviderState {
    pages: HashMap<Key, String>,
    failures: HashMap<Key, VecDeque<Failure>>,
    seen: Vec<SeenRequest>,
}

/// Handle to the running fake provider.
pub struct FakeProvider {
    addr: SocketAddr,
    state: Arc<Mutex<ProviderState>>,
}

impl FakeProvider {
    /// Start the server on a random port. Returns once it is listening.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ProviderState::default()));

        let app = Router::new()
            .route("/nfl/v1/{resource}", get(list_resource))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Base URL to configure the client with (e.g. `http://127.0.0.1:PORT/nfl/v1`).
    pub fn base_url(&self) -> String {
        format!("http://{}/nfl/v1", self.addr)
    }

    /// Answer `resource` at `cursor` with `body` (a JSON envelope).
    pub async fn serve(&self, resource: &str, cursor: Option<&str>, body: serde_json::Value) {
        self.serve_raw(resource, cursor, body.to_string()).await;
    }

    /// Answer with an arbitrary body, valid JSON or not.
    pub async fn serve_raw(&self, resource: &str, cursor: Option<&str>, body: impl Into<String>) {
        self.state
            .lock()
            .await
            .pages
            .insert(key(resource, cursor), body.into());
    }

    /// Answer the next `times` requests for `(resource, cursor)` with `status`.
    pub async fn fail_times(&self, resource: &str, cursor: Option<&str>, status: u16, times: usize) {
        self.push_failures(resource, cursor, status, None, times).await;
    }

    /// Like [`fail_times`](Self::fail_times) but with a `Retry-After` header.
    pub async fn throttle(&self, resource: &str, cursor: Option<&str>, retry_after_secs: u64) {
        self.push_failures(resource, cursor, 429, Some(retry_after_secs), 1)
            .await;
    }

    async fn push_failures(
        &self,
        resource: &str,
        cursor: Option<&str>,
        status: u16,
        retry_after: Option<u64>,
        times: usize,
    ) {
        let mut state = self.state.lock().await;
        let queue = state.failures.entry(key(resource, cursor)).or_default();
        for _ in 0..times {
            queue.push_back(Failure {
                status,
                retry_after,
            });
        }
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<SeenRequest> {
        self.state.lock().await.seen.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.seen.len()
    }
}

fn key(resource: &str, cursor: Option<&str>) -> Key {
    (resource.to_string(), cursor.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn list_resource(
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<Arc<Mutex<ProviderState>>>,
) -> Response {
    let cursor = params.get("cursor").cloned();
    let mut state = state.lock().await;
    state.seen.push(SeenRequest {
        resource: resource.clone(),
        cursor: cursor.clone(),
        per_page: params.get("per_page").and_then(|p| p.parse().ok()),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let key = (resource, cursor);
    if let Some(failure) = state.failures.get_mut(&key).and_then(VecDeque::pop_front) {
        let status = StatusCode::from_u16(failure.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, "provider error").into_response();
        if let Some(secs) = failure.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, secs.to_string().parse().unwrap());
        }
        return response;
    }

    match state.pages.get(&key) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no such page").into_response(),
    }
}
