//! codegen-relay: streaming SSE relay for code-generation prompts.
//!
//! Accepts a prompt on `POST /stream`, wraps it in fixed Java code-generation
//! instructions, forwards it to an OpenAI-compatible chat-completions API and
//! relays the upstream's event stream back to the caller, preceded by one
//! placeholder event and closed by a single `[DONE]` event.

pub mod config;
pub mod server;
pub mod upstream;
