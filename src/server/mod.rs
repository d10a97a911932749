//! HTTP server exposing the relay.
//!
//! - [`api`]: Router, shared state and route handlers
//! - [`streaming`]: SSE frames and the task that relays the upstream stream
//! - [`metrics`]: Prometheus counters served on `/metrics`

pub mod api;
pub mod metrics;
pub mod streaming;
