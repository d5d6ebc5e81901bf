//! Gateway error types.

use common::CorrelationId;
use thiserror::Error;

/// Why a request could not be relayed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route prefix matches the request path.
    #[error("no route matches the request path")]
    NoRoute,

    /// The route's circuit is open; the downstream was not called.
    #[error("circuit open, downstream not called")]
    CircuitOpen,

    /// The downstream did not answer within the route's deadline.
    #[error("downstream call timed out")]
    Timeout,

    /// The downstream could not be reached or broke the connection.
    #[error("downstream call failed: {0}")]
    Downstream(String),
}

impl GatewayError {
    /// Stable machine-readable error kind for structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoRoute => "no_route",
            GatewayError::CircuitOpen => "circuit_open",
            GatewayError::Timeout => "timeout",
            GatewayError::Downstream(_) => "bad_gateway",
        }
    }
}

/// A failed routing attempt, carrying the correlation id so the edge can
/// still echo it on the error response.
#[derive(Debug)]
pub struct RouteFailure {
    pub correlation_id: CorrelationId,
    pub error: GatewayError,
}

impl std::fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}
