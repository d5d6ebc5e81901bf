//! Resilient API gateway.
//!
//! Inbound requests are matched against a static route table by longest
//! path prefix and forwarded to the owning downstream service. Every route
//! carries its own resilience policy: a circuit breaker that fails fast
//! while a downstream is known-bad, and a bounded exponential-backoff retry
//! that applies to idempotent reads only. A correlation identifier is
//! attached to every forwarded request and echoed on every response.

pub mod breaker;
pub mod error;
pub mod forward;
pub mod metrics;
pub mod retry;
pub mod router;
pub mod routes;
pub mod server;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use error::{GatewayError, RouteFailure};
pub use forward::{Downstream, ForwardError, HttpDownstream, ProxyRequest, ProxyResponse};
pub use metrics::{CapturingGatewayMetrics, GatewayMetrics, RecorderGatewayMetrics};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use router::GatewayRouter;
pub use routes::{RouteDefinition, RoutePolicy, RouteTable, default_routes};
pub use server::create_app;
