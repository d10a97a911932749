//! HTTP client for the upstream chat-completions API.
//!
//! One [`UpstreamClient`] is built at startup and cloned into every request;
//! the underlying `reqwest::Client` pools connections and is safe to share.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::upstream::payload::UpstreamChatPayload;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
}

impl UpstreamClient {
    /// Build a client with the configured connect and read timeouts.
    ///
    /// No overall request deadline is set, so long generations are not cut off
    /// as long as the upstream keeps sending.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.chat_completions_url(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the streaming chat request and wait for the response head.
    ///
    /// Returns the response with its body unread. Any status other than
    /// 200 is turned into [`UpstreamError::Status`] without touching the body.
    pub async fn open_stream(
        &self,
        token: &str,
        payload: &UpstreamChatPayload,
    ) -> Result<Response, UpstreamError> {
        debug!(endpoint = %self.endpoint, model = payload.model(), "Opening upstream stream");

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        Ok(response)
    }
}
