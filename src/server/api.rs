//! HTTP API of the relay.
//!
//! - POST /stream
//! - GET /health
//! - GET /metrics

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::server::metrics::{outcome, RelayMetrics};
use crate::server::streaming::{relay_to_sse_stream, RelayJob};
use crate::upstream::client::{UpstreamClient, UpstreamError};
use crate::upstream::payload::{PromptRequest, UpstreamChatPayload};

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub upstream: UpstreamClient,
    pub metrics: RelayMetrics,
    pub start_time: Instant,
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl AppState {
    pub fn new(config: Arc<RelayConfig>) -> Result<Self, StateError> {
        Ok(Self {
            upstream: UpstreamClient::new(&config.upstream)?,
            metrics: RelayMetrics::new()?,
            config,
            start_time: Instant::now(),
        })
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stream", post(stream_prompt))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Failures reported before any event has been streamed.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("AIPIPE_TOKEN not configured")]
    TokenNotConfigured,

    #[error("Streaming must be true")]
    StreamingRequired,

    #[error("failed to render metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::StreamingRequired => StatusCode::BAD_REQUEST,
            RelayError::TokenNotConfigured | RelayError::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub upstream: String,
    pub token_configured: bool,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn stream_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PromptRequest>,
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4().to_string();

    let Some(token) = state.config.upstream.token() else {
        warn!(request_id = %request_id, "Rejecting prompt: upstream token not configured");
        state.metrics.record_request(outcome::TOKEN_MISSING);
        return Err(RelayError::TokenNotConfigured);
    };

    if !req.stream {
        info!(request_id = %request_id, "Rejecting prompt: streaming disabled by caller");
        state.metrics.record_request(outcome::STREAM_DISABLED);
        return Err(RelayError::StreamingRequired);
    }

    info!(
        request_id = %request_id,
        prompt_chars = req.prompt.chars().count(),
        "Relaying prompt"
    );
    state.metrics.record_request(outcome::STREAMED);

    let job = RelayJob {
        request_id,
        client: state.upstream.clone(),
        token: token.to_string(),
        payload: UpstreamChatPayload::build(&req.prompt, &state.config.generation),
        metrics: state.metrics.clone(),
    };

    let headers = [
        (header::CONTENT_TYPE, "text/event-stream"),
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
    ];
    Ok((headers, Body::from_stream(relay_to_sse_stream(job))).into_response())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        upstream: state.config.upstream.base_url.clone(),
        token_configured: state.config.upstream.token().is_some(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, RelayError> {
    Ok(state.metrics.render()?)
}
