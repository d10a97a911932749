//! Request types on both sides of the relay.

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

/// Body of `POST /stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Streaming chat-completions request sent upstream (OpenAI-compatible).
///
/// Built once per relayed prompt and never modified afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamChatPayload {
    model: String,
    stream: bool,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

impl UpstreamChatPayload {
    pub fn build(prompt: &str, generation: &GenerationConfig) -> Self {
        Self {
            model: generation.model.clone(),
            stream: true,
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
            messages: vec![
                ChatMessage::system(generation.system_prompt.as_str()),
                ChatMessage::user(wrap_prompt(prompt)),
            ],
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Interpolate the caller's prompt into the code-generation instructions.
pub fn wrap_prompt(prompt: &str) -> String {
    format!(
        "
Generate a complete Java class named DataProcessor.
Minimum 120 lines.
Minimum 2500 characters.
Include file reading, validation methods,
error handling, helper methods, logging, and comments.

{prompt}
"
    )
}
