//! The gateway router.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use common::CorrelationId;

use crate::error::{GatewayError, RouteFailure};
use crate::forward::{Downstream, ForwardError, ProxyRequest, ProxyResponse};
use crate::metrics::GatewayMetrics;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::routes::RouteTable;

/// Route label used for requests no route owns.
const UNMATCHED: &str = "unmatched";

/// Matches requests to routes and relays them with per-route resilience.
pub struct GatewayRouter {
    table: RouteTable,
    downstream: Arc<dyn Downstream>,
    metrics: Arc<dyn GatewayMetrics>,
}

impl GatewayRouter {
    /// Creates a router over a fixed table.
    pub fn new(
        table: RouteTable,
        downstream: Arc<dyn Downstream>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            table,
            downstream,
            metrics,
        }
    }

    /// Relays one request.
    ///
    /// The inbound correlation id is reused when present, otherwise a fresh
    /// one is attached; either way it travels downstream unchanged and is
    /// echoed on the response. Idempotent reads get the route's retry
    /// policy; writes are never retried. Transport failures feed the
    /// route's circuit breaker.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn route(&self, mut request: ProxyRequest) -> Result<ProxyResponse, RouteFailure> {
        let correlation_id = ensure_correlation(&mut request.headers);
        let fail = |error: GatewayError| RouteFailure {
            correlation_id,
            error,
        };

        let Some(entry) = self.table.match_route(&request.path) else {
            self.metrics.record_error(UNMATCHED, "no_route");
            tracing::debug!("no route for path");
            return Err(fail(GatewayError::NoRoute));
        };
        let prefix = entry.definition.path_prefix.as_str();
        self.metrics.record_request(prefix);

        if !entry.breaker.try_acquire() {
            self.metrics.record_error(prefix, "circuit_open");
            return Err(fail(GatewayError::CircuitOpen));
        }

        let policy = &entry.definition.policy;
        let retry = if request.is_idempotent_read() {
            policy.retry.clone()
        } else {
            RetryPolicy::none()
        };
        let target = entry.definition.target();
        let timeout = policy.timeout;

        let outcome = retry_with_backoff(&retry, ForwardError::is_transient, |_attempt| {
            let downstream = self.downstream.clone();
            let target = target.clone();
            let request = &request;
            async move { downstream.send(&target, request, timeout).await }
        })
        .await;

        match outcome {
            Ok(mut response) => {
                entry.breaker.record_success();
                self.metrics.record_success(prefix);
                set_correlation(&mut response.headers, correlation_id);
                Ok(response)
            }
            Err(err) => {
                entry.breaker.record_failure();
                let error = match err {
                    ForwardError::Timeout => GatewayError::Timeout,
                    other => GatewayError::Downstream(other.to_string()),
                };
                self.metrics.record_error(prefix, error.kind());
                tracing::warn!(route = prefix, error = %error, "relay failed");
                Err(fail(error))
            }
        }
    }
}

/// Reuses the inbound correlation id or attaches a fresh one.
fn ensure_correlation(headers: &mut HeaderMap) -> CorrelationId {
    if let Some(value) = headers.get(CorrelationId::HEADER)
        && let Ok(text) = value.to_str()
        && let Some(id) = CorrelationId::parse(text)
    {
        return id;
    }

    let id = CorrelationId::new();
    set_correlation(headers, id);
    id
}

fn set_correlation(headers: &mut HeaderMap, id: CorrelationId) {
    if let Ok(value) = HeaderValue::try_from(id.to_string()) {
        headers.insert(CorrelationId::HEADER, value);
    }
}
