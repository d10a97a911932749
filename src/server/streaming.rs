//! SSE (Server-Sent Events) relay of the upstream completion stream.
//!
//! Every relayed response has the same shape:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Generating Java code...\n"}}]}
//! data: <upstream payload>        (zero or more, verbatim)
//! data: {"error":"API error 503"}  (only when the upstream rejects the call)
//! data: [DONE]                     (exactly once, always last)
//! ```
//!
//! A spawned task drives the upstream call and pushes frames into a bounded
//! channel; the receiving end is the body of the client's SSE response.
//! Frames are written as raw `data: <payload>\n\n` text so that an empty
//! upstream payload still reaches the client as a `data: ` frame.

use std::convert::Infallible;

use bytes::Bytes;
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::server::metrics::{failure, RelayMetrics};
use crate::upstream::client::{UpstreamClient, UpstreamError};
use crate::upstream::lines::LineBuffer;
use crate::upstream::payload::UpstreamChatPayload;

/// Content of the first event, sent before the upstream is contacted.
pub const PLACEHOLDER_CONTENT: &str = "Generating Java code...\n";

/// End-of-stream token used by the upstream and by the relay.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";

/// Frames buffered between the relay task and the client connection.
const CHANNEL_CAPACITY: usize = 64;

/// Minimal streaming chunk carrying only a content delta.
#[derive(Debug, Serialize)]
pub struct DeltaChunk {
    pub choices: Vec<DeltaChoice>,
}

#[derive(Debug, Serialize)]
pub struct DeltaChoice {
    pub delta: Delta,
}

#[derive(Debug, Serialize)]
pub struct Delta {
    pub content: String,
}

impl DeltaChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            choices: vec![DeltaChoice {
                delta: Delta {
                    content: text.into(),
                },
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorChunk {
    error: String,
}

/// Frame a payload as one SSE `data` event.
pub fn data_frame(payload: &str) -> Bytes {
    Bytes::from(format!("{DATA_PREFIX}{payload}\n\n"))
}

pub fn placeholder_frame() -> Bytes {
    let data = serde_json::to_string(&DeltaChunk::content(PLACEHOLDER_CONTENT)).unwrap_or_default();
    data_frame(&data)
}

pub fn error_frame(status: u16) -> Bytes {
    let chunk = ErrorChunk {
        error: UpstreamError::Status(status).to_string(),
    };
    data_frame(&serde_json::to_string(&chunk).unwrap_or_default())
}

pub fn done_frame() -> Bytes {
    data_frame(DONE_SENTINEL)
}

/// What to do with one line of the upstream body.
#[derive(Debug, PartialEq, Eq)]
pub enum LineAction<'a> {
    /// Re-emit this payload as-is.
    Forward(&'a str),
    /// The upstream signalled the end of the stream.
    Stop,
    /// Not a data line.
    Skip,
}

pub fn classify_line(line: &str) -> LineAction<'_> {
    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) if payload.trim() == DONE_SENTINEL => LineAction::Stop,
        Some(payload) => LineAction::Forward(payload),
        None => LineAction::Skip,
    }
}

/// Everything the relay task needs for one request.
pub struct RelayJob {
    pub request_id: String,
    pub client: UpstreamClient,
    pub token: String,
    pub payload: UpstreamChatPayload,
    pub metrics: RelayMetrics,
}

/// How the upstream phase of a relay ended.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    /// Keep reading.
    Continue,
    /// Upstream is finished; the terminal frame still has to go out.
    Finished,
    /// The client hung up; nothing more can be sent.
    ClientGone,
}

/// Start relaying and return the frame stream for the client response body.
pub fn relay_to_sse_stream(job: RelayJob) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(run_relay(job, tx));
    ReceiverStream::new(rx).map(Ok)
}

async fn run_relay(job: RelayJob, tx: mpsc::Sender<Bytes>) {
    if tx.send(placeholder_frame()).await.is_err() {
        job.metrics.record_disconnect();
        return;
    }

    // Stop reading the upstream as soon as the client goes away, even while
    // blocked waiting for the next upstream chunk.
    let flow = tokio::select! {
        flow = pump_upstream(&job, &tx) => flow,
        _ = tx.closed() => Flow::ClientGone,
    };

    if flow == Flow::ClientGone || tx.send(done_frame()).await.is_err() {
        info!(request_id = %job.request_id, "Client disconnected, upstream read aborted");
        job.metrics.record_disconnect();
        return;
    }

    debug!(request_id = %job.request_id, "Relay stream complete");
}

async fn pump_upstream(job: &RelayJob, tx: &mpsc::Sender<Bytes>) -> Flow {
    let response = match job.client.open_stream(&job.token, &job.payload).await {
        Ok(response) => response,
        Err(UpstreamError::Status(status)) => {
            warn!(request_id = %job.request_id, status, "Upstream returned an error status");
            job.metrics.record_upstream_failure(failure::STATUS);
            return match tx.send(error_frame(status)).await {
                Ok(()) => Flow::Finished,
                Err(_) => Flow::ClientGone,
            };
        }
        Err(e) => {
            warn!(
                request_id = %job.request_id,
                endpoint = job.client.endpoint(),
                error = %e,
                "Upstream request failed"
            );
            job.metrics.record_upstream_failure(failure::TRANSPORT);
            return Flow::Finished;
        }
    };

    let mut body = response.bytes_stream();
    let mut lines = LineBuffer::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(request_id = %job.request_id, error = %e, "Upstream stream broke off");
                job.metrics.record_upstream_failure(failure::TRANSPORT);
                return Flow::Finished;
            }
        };

        lines.push_chunk(&chunk);
        while let Some(line) = lines.next_line() {
            match dispatch_line(job, tx, &line).await {
                Flow::Continue => {}
                flow => return flow,
            }
        }
    }

    match lines.finish() {
        Some(line) => match dispatch_line(job, tx, &line).await {
            Flow::Continue => Flow::Finished,
            flow => flow,
        },
        None => Flow::Finished,
    }
}

async fn dispatch_line(job: &RelayJob, tx: &mpsc::Sender<Bytes>, line: &str) -> Flow {
    match classify_line(line) {
        LineAction::Forward(payload) => {
            if tx.send(data_frame(payload)).await.is_err() {
                return Flow::ClientGone;
            }
            job.metrics.record_forwarded();
            Flow::Continue
        }
        LineAction::Stop => Flow::Finished,
        LineAction::Skip => Flow::Continue,
    }
}
