//! Gateway metrics, keyed by route.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Metrics surface of the gateway.
pub trait GatewayMetrics: Send + Sync {
    /// A request matched the route and entered the forwarding path.
    fn record_request(&self, route: &str);

    /// The downstream answered and its response was relayed.
    fn record_success(&self, route: &str);

    /// The request failed with the given error kind before a relay.
    fn record_error(&self, route: &str, kind: &str);
}

/// Forwards to the installed `metrics` recorder (Prometheus in the binary).
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderGatewayMetrics;

impl GatewayMetrics for RecorderGatewayMetrics {
    fn record_request(&self, route: &str) {
        metrics::counter!("api_gateway_requests_total", "route" => route.to_string()).increment(1);
    }

    fn record_success(&self, route: &str) {
        metrics::counter!("api_gateway_responses_total", "route" => route.to_string()).increment(1);
    }

    fn record_error(&self, route: &str, kind: &str) {
        metrics::counter!(
            "api_gateway_errors_total",
            "route" => route.to_string(),
            "kind" => kind.to_string()
        )
        .increment(1);
    }
}

/// Counts every recording in process memory, for tests.
#[derive(Clone, Default)]
pub struct CapturingGatewayMetrics {
    counts: Arc<Mutex<HashMap<String, u64>>>,
}

impl CapturingGatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times a key was recorded, e.g.
    /// `request:/api/orders`, `success:/api/orders`,
    /// `error:/api/orders:circuit_open`.
    pub fn count(&self, key: &str) -> u64 {
        self.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn bump(&self, key: String) {
        *self.counts.lock().unwrap().entry(key).or_insert(0) += 1;
    }
}

impl GatewayMetrics for CapturingGatewayMetrics {
    fn record_request(&self, route: &str) {
        self.bump(format!("request:{route}"));
    }

    fn record_success(&self, route: &str) {
        self.bump(format!("success:{route}"));
    }

    fn record_error(&self, route: &str, kind: &str) {
        self.bump(format!("error:{route}:{kind}"));
    }
}
