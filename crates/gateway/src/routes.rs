//! Route definitions and prefix matching.
//!
//! The route table is built once at gateway startup from static
//! configuration and read-only afterwards. Each route owns its circuit
//! breaker; the breaker is the only state on a route that mutates at
//! runtime.

use std::time::Duration;

use common::ServicePorts;
use common::ports::service;

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::retry::RetryPolicy;

/// Resilience settings for one route.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    /// Per-request downstream deadline.
    pub timeout: Duration,
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open.
    pub cooldown: Duration,
    /// Retry behavior for idempotent reads.
    pub retry: RetryPolicy,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// One downstream route.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    /// Inbound path prefix this route owns.
    pub path_prefix: String,
    /// Downstream host.
    pub downstream_host: String,
    /// Downstream port.
    pub downstream_port: u16,
    /// Resilience policy applied to every forwarded request.
    pub policy: RoutePolicy,
}

impl RouteDefinition {
    /// Creates a route with the default policy.
    pub fn new(path_prefix: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            downstream_host: host.into(),
            downstream_port: port,
            policy: RoutePolicy::default(),
        }
    }

    /// Replaces the route's resilience policy.
    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Base URL of the downstream service.
    pub fn target(&self) -> String {
        format!("http://{}:{}", self.downstream_host, self.downstream_port)
    }
}

/// A route plus its runtime breaker state.
pub struct RouteEntry {
    pub definition: RouteDefinition,
    pub breaker: CircuitBreaker,
}

/// The gateway's routing table.
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Builds the table, wiring a circuit breaker per route from its policy.
    pub fn new(definitions: Vec<RouteDefinition>) -> Self {
        let routes = definitions
            .into_iter()
            .map(|definition| {
                let breaker = CircuitBreaker::new(BreakerConfig {
                    failure_threshold: definition.policy.failure_threshold,
                    cooldown: definition.policy.cooldown,
                });
                RouteEntry {
                    definition,
                    breaker,
                }
            })
            .collect();
        Self { routes }
    }

    /// Finds the route owning `path` by longest-prefix match.
    pub fn match_route(&self, path: &str) -> Option<&RouteEntry> {
        self.routes
            .iter()
            .filter(|entry| path.starts_with(&entry.definition.path_prefix))
            .max_by_key(|entry| entry.definition.path_prefix.len())
    }

    /// Number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are configured.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The platform's standard route table: one route per backend service,
/// addressed on loopback at the service's registered default port.
pub fn default_routes(ports: &ServicePorts) -> Vec<RouteDefinition> {
    let service_routes = [
        ("/api/products", service::PRODUCTS),
        ("/api/orders", service::ORDERS),
        ("/api/payments", service::PAYMENTS),
        ("/api/notifications", service::NOTIFICATIONS),
        ("/api/users", service::USERS),
        ("/api/inventory", service::INVENTORY),
    ];

    service_routes
        .into_iter()
        .filter_map(|(prefix, name)| {
            ports
                .binding(name)
                .map(|binding| RouteDefinition::new(prefix, "127.0.0.1", binding.current_port))
        })
        .collect()
}
