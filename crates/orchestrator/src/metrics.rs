//! Order metrics.
//!
//! Components never touch a global counter directly; they record through an
//! injected [`OrderMetrics`] implementation. The production implementation
//! forwards to the process-wide `metrics` recorder, the capturing one backs
//! assertions in tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Metrics surface of the order service.
pub trait OrderMetrics: Send + Sync {
    /// An order was created with the given initial status.
    fn order_created(&self, status: &str);

    /// An order moved between statuses.
    fn status_changed(&self, from: &str, to: &str);

    /// An operation failed with the given error kind.
    fn order_error(&self, kind: &str);

    /// Wall-clock time spent handling an order operation.
    fn processing_time(&self, seconds: f64);
}

/// Forwards to the installed `metrics` recorder (Prometheus in the binaries).
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderOrderMetrics;

impl OrderMetrics for RecorderOrderMetrics {
    fn order_created(&self, status: &str) {
        metrics::counter!("order_service_orders_created_total", "status" => status.to_string())
            .increment(1);
    }

    fn status_changed(&self, from: &str, to: &str) {
        metrics::counter!(
            "order_service_orders_status_changed_total",
            "from_status" => from.to_string(),
            "to_status" => to.to_string()
        )
        .increment(1);
    }

    fn order_error(&self, kind: &str) {
        metrics::counter!("order_service_errors_total", "error_type" => kind.to_string())
            .increment(1);
    }

    fn processing_time(&self, seconds: f64) {
        metrics::histogram!("order_service_order_processing_seconds").record(seconds);
    }
}

/// Counts every recording in process memory, for tests.
#[derive(Clone, Default)]
pub struct CapturingOrderMetrics {
    counts: Arc<Mutex<HashMap<String, u64>>>,
    timings: Arc<Mutex<Vec<f64>>>,
}

impl CapturingOrderMetrics {
    /// Creates a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times a key was recorded, e.g. `created:Pending`,
    /// `status:Pending->Processing`, `error:item_unavailable`.
    pub fn count(&self, key: &str) -> u64 {
        self.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Returns the number of recorded timings.
    pub fn timing_count(&self) -> usize {
        self.timings.lock().unwrap().len()
    }

    fn bump(&self, key: String) {
        *self.counts.lock().unwrap().entry(key).or_insert(0) += 1;
    }
}

impl OrderMetrics for CapturingOrderMetrics {
    fn order_created(&self, status: &str) {
        self.bump(format!("created:{status}"));
    }

    fn status_changed(&self, from: &str, to: &str) {
        self.bump(format!("status:{from}->{to}"));
    }

    fn order_error(&self, kind: &str) {
        self.bump(format!("error:{kind}"));
    }

    fn processing_time(&self, seconds: f64) {
        self.timings.lock().unwrap().push(seconds);
    }
}
