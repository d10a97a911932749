//! Prometheus counters for the relay.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label values for `relay_requests_total`.
pub mod outcome {
    pub const STREAMED: &str = "streamed";
    pub const TOKEN_MISSING: &str = "token_missing";
    pub const STREAM_DISABLED: &str = "stream_disabled";
}

/// Failure label values for `relay_upstream_failures_total`.
pub mod failure {
    pub const STATUS: &str = "status";
    pub const TRANSPORT: &str = "transport";
}

#[derive(Clone)]
pub struct RelayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    upstream_failures: IntCounterVec,
    frames_forwarded: IntCounter,
    client_disconnects: IntCounter,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("relay_requests_total", "Prompt requests by outcome"),
            &["outcome"],
        )?;
        let upstream_failures = IntCounterVec::new(
            Opts::new(
                "relay_upstream_failures_total",
                "Upstream calls that failed, by kind",
            ),
            &["kind"],
        )?;
        let frames_forwarded = IntCounter::new(
            "relay_frames_forwarded_total",
            "Upstream data frames forwarded to clients",
        )?;
        let client_disconnects = IntCounter::new(
            "relay_client_disconnects_total",
            "Streams abandoned because the client went away",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(upstream_failures.clone()))?;
        registry.register(Box::new(frames_forwarded.clone()))?;
        registry.register(Box::new(client_disconnects.clone()))?;

        Ok(Self {
            registry,
            requests,
            upstream_failures,
            frames_forwarded,
            client_disconnects,
        })
    }

    pub fn record_request(&self, outcome: &str) {
        self.requests.with_label_values(&[outcome]).inc();
    }

    pub fn record_upstream_failure(&self, kind: &str) {
        self.upstream_failures.with_label_values(&[kind]).inc();
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.inc();
    }

    pub fn record_disconnect(&self) {
        self.client_disconnects.inc();
    }

    pub fn requests(&self, outcome: &str) -> u64 {
        self.requests.with_label_values(&[outcome]).get()
    }

    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded.get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.record_request(outcome::STREAMED);
        metrics.record_request(outcome::STREAMED);
        metrics.record_upstream_failure(failure::STATUS);
        metrics.record_forwarded();

        assert_eq!(metrics.requests(outcome::STREAMED), 2);
        assert_eq!(metrics.requests(outcome::TOKEN_MISSING), 0);
        assert_eq!(metrics.frames_forwarded(), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("relay_requests_total{outcome=\"streamed\"} 2"));
        assert!(text.contains("relay_upstream_failures_total{kind=\"status\"} 1"));
    }
}
