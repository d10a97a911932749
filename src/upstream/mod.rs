//! Outbound side of the relay.
//!
//! - [`payload`]: inbound prompt request and the chat payload built from it
//! - [`client`]: shared HTTP client for the streaming chat-completions call
//! - [`lines`]: line reassembly over the upstream's raw body chunks

pub mod client;
pub mod lines;
pub mod payload;
