//! In-process stand-in for the WeatherAPI.com HTTP endpoint.

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    requests: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<String>>>,
}

async fn respond(State(canned): State<Canned>, RawQuery(query): RawQuery) -> impl IntoResponse {
    canned.requests.fetch_add(1, Ordering::SeqCst);
    *canned.last_query.lock().unwrap() = query;
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.clone(),
    )
}

/// A local server answering `GET /v1/current.json` and
/// `GET /v1/forecast.json` with the same fixed response.
///
/// The server task is aborted when the value is dropped.
pub struct MockUpstream {
    base_url: String,
    requests: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<String>>>,
    task: JoinHandle<()>,
}

impl MockUpstream {
    /// Serve `body` as JSON with status `status`.
    pub async fn start(status: StatusCode, body: serde_json::Value) -> Self {
        Self::start_raw(status, body.to_string()).await
    }

    /// Serve an arbitrary body, e.g. a truncated or non-JSON payload.
    pub async fn start_raw(status: StatusCode, body: impl Into<String>) -> Self {
        let canned = Canned {
            status,
            body: body.into(),
            requests: Arc::new(AtomicUsize::new(0)),
            last_query: Arc::new(Mutex::new(None)),
        };
        let requests = canned.requests.clone();
        let last_query = canned.last_query.clone();

        let app = Router::new()
            .route("/v1/current.json", get(respond))
            .route("/v1/forecast.json", get(respond))
            .with_state(canned);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock upstream address");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/v1", addr),
            requests,
            last_query,
            task,
        }
    }

    /// Value for `WeatherApiConfig::base_url`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Raw query string of the most recent request.
    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
