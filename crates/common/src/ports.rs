//! Startup service-port resolution.
//!
//! Each service has a well-known default port. At process start the service
//! asks [`ServicePorts`] for a usable port: the resolver probes loopback
//! starting at the default and walks upward past ports that are already in
//! use, logging a warning per collision so operators can spot port drift.

use std::collections::HashMap;
use std::net::TcpListener;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// How many ports past the default are probed before giving up.
pub const SCAN_LIMIT: u16 = 100;

/// Errors that can occur during port resolution.
#[derive(Debug, Error)]
pub enum PortError {
    /// The service name was never registered.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// Every port in `default..=default + SCAN_LIMIT` was in use.
    #[error("no free port for {service} in {start}..={end}")]
    ResolutionExhausted {
        service: String,
        start: u16,
        end: u16,
    },
}

/// The resolved port assignment for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePortBinding {
    /// Registered service name.
    pub service: String,
    /// The port the service prefers.
    pub default_port: u16,
    /// The port actually handed out (equals `default_port` unless shifted).
    pub current_port: u16,
    /// When the binding was resolved; `None` until [`ServicePorts::resolve`]
    /// has been called for this service.
    pub bound_at: Option<DateTime<Utc>>,
}

/// Well-known service names.
pub mod service {
    pub const API_GATEWAY: &str = "api-gateway";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const PAYMENTS: &str = "payments";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const USERS: &str = "users";
    pub const INVENTORY: &str = "inventory";
    pub const FRONTEND: &str = "frontend";
}

/// Registry of per-service port assignments, resolved once at startup.
///
/// The probe opens and immediately releases a loopback listener, so there is
/// a window between a successful probe and the caller actually binding the
/// port in which another process can grab it. `resolve` is therefore
/// best-effort, not a reservation.
#[derive(Debug)]
pub struct ServicePorts {
    bindings: HashMap<String, ServicePortBinding>,
}

impl ServicePorts {
    /// Creates an empty registry with no known services.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Creates a registry pre-loaded with the platform's service table.
    pub fn with_defaults() -> Self {
        let mut ports = Self::new();
        ports.register(service::API_GATEWAY, 5001);
        ports.register(service::PRODUCTS, 5011);
        ports.register(service::ORDERS, 5012);
        ports.register(service::PAYMENTS, 5013);
        ports.register(service::NOTIFICATIONS, 5014);
        ports.register(service::USERS, 5015);
        ports.register(service::INVENTORY, 5018);
        ports.register(service::FRONTEND, 5019);
        ports
    }

    /// Registers a service with its preferred default port.
    pub fn register(&mut self, name: impl Into<String>, default_port: u16) {
        let name = name.into();
        self.bindings.insert(
            name.clone(),
            ServicePortBinding {
                service: name,
                default_port,
                current_port: default_port,
                bound_at: None,
            },
        );
    }

    /// Returns the binding for a service, if registered.
    pub fn binding(&self, name: &str) -> Option<&ServicePortBinding> {
        self.bindings.get(name)
    }

    /// Finds a free port for `name`, scanning upward from its default.
    ///
    /// The successful port is recorded for the remainder of the process and
    /// returned. Fails with [`PortError::UnknownService`] for unregistered
    /// names and [`PortError::ResolutionExhausted`] once the scan walks past
    /// `default + SCAN_LIMIT`.
    pub fn resolve(&mut self, name: &str) -> Result<u16, PortError> {
        self.resolve_with(name, port_is_free)
    }

    /// Same as [`resolve`](Self::resolve) but with a caller-supplied probe.
    pub fn resolve_with(
        &mut self,
        name: &str,
        mut probe: impl FnMut(u16) -> bool,
    ) -> Result<u16, PortError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| PortError::UnknownService(name.to_string()))?;

        let default_port = binding.default_port;
        let mut port = binding.current_port;

        while !probe(port) {
            tracing::warn!(
                service = name,
                port,
                "port in use, attempting next available port"
            );
            port += 1;

            if port > default_port + SCAN_LIMIT {
                tracing::error!(
                    service = name,
                    default_port,
                    "unable to find a free port after {} attempts",
                    SCAN_LIMIT
                );
                return Err(PortError::ResolutionExhausted {
                    service: name.to_string(),
                    start: default_port,
                    end: default_port + SCAN_LIMIT,
                });
            }
        }

        if port != binding.current_port {
            tracing::info!(
                service = name,
                port,
                default_port,
                "service shifted off its default port"
            );
        }
        binding.current_port = port;
        binding.bound_at = Some(Utc::now());

        Ok(port)
    }
}

impl Default for ServicePorts {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}
