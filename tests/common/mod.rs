// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream;
use tokio::net::TcpListener;

use codegen_relay::config::{GenerationConfig, RelayConfig, UpstreamConfig};
use codegen_relay::server::api::{build_router, AppState};

pub const TEST_TOKEN: &str = "test-token";

pub const PLACEHOLDER_FRAME: &str =
    r#"data: {"choices":[{"delta":{"content":"Generating Java code...\n"}}]}"#;
pub const DONE_FRAME: &str = "data: [DONE]";

/// How the mock upstream answers `POST /chat/completions`.
#[derive(Clone)]
pub enum MockReply {
    /// Reply with this status and a short JSON error body.
    Status(u16),
    /// Reply 200 and write these body chunks in order.
    Chunks(Vec<String>),
    /// Reply 200, write these chunks, then break the connection.
    ChunksThenFail(Vec<String>),
}

/// A request captured by the mock upstream.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

struct MockState {
    reply: MockReply,
    delay: Duration,
    hits: AtomicUsize,
    last: Mutex<Option<CapturedRequest>>,
}

/// In-process stand-in for the chat-completions API.
pub struct MockUpstream {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start(reply: MockReply) -> Self {
        Self::start_with_delay(reply, Duration::ZERO).await
    }

    /// Like [`start`](Self::start), but wait `delay` before sending the response head.
    pub async fn start_with_delay(reply: MockReply, delay: Duration) -> Self {
        let state = Arc::new(MockState {
            reply,
            delay,
            hits: AtomicUsize::new(0),
            last: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.state.last.lock().unwrap().clone()
    }
}

async fn chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last.lock().unwrap() = Some(CapturedRequest {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    match &state.reply {
        MockReply::Status(code) => (
            StatusCode::from_u16(*code).unwrap(),
            r#"{"error":{"message":"unavailable"}}"#,
        )
            .into_response(),
        MockReply::Chunks(chunks) => {
            let items: Vec<Result<Bytes, Infallible>> =
                chunks.iter().cloned().map(|c| Ok(Bytes::from(c))).collect();
            sse_response(Body::from_stream(stream::iter(items)))
        }
        MockReply::ChunksThenFail(chunks) => {
            let mut items: Vec<Result<Bytes, std::io::Error>> =
                chunks.iter().cloned().map(|c| Ok(Bytes::from(c))).collect();
            items.push(Err(std::io::Error::other("upstream crashed")));
            sse_response(Body::from_stream(stream::iter(items)))
        }
    }
}

fn sse_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(body)
        .unwrap()
}

pub fn relay_config(base_url: &str, token: Option<&str>) -> RelayConfig {
    RelayConfig {
        upstream: UpstreamConfig::new(base_url, token.map(str::to_string)),
        generation: GenerationConfig::default(),
    }
}

pub fn relay_state(base_url: &str, token: Option<&str>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(relay_config(base_url, token))).unwrap())
}

/// Serve the relay on an ephemeral port and return its base URL.
pub async fn spawn_relay(state: Arc<AppState>) -> String {
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Split an SSE body into its frames (without the blank-line separators).
pub fn frames(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format upstream data lines the way an SSE server would.
pub fn sse_lines(payloads: &[&str]) -> Vec<String> {
    payloads.iter().map(|p| format!("data: {p}\n\n")).collect()
}
