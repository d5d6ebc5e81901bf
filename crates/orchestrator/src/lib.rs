//! Order orchestration.
//!
//! The orchestrator drives the order-creation saga: every line item is
//! validated against the product service (availability and current price)
//! before anything is written, the order and its items are then persisted as
//! one unit, and finally a domain event is published to the bus with
//! best-effort semantics: a failed publish is logged and counted but never
//! rolls back the committed order. Status updates repeat the persist+publish
//! tail with transition validation.

pub mod error;
pub mod events;
pub mod metrics;
pub mod products;
pub mod publisher;
pub mod service;

pub use error::OrchestratorError;
pub use events::{DomainEvent, topics};
pub use metrics::{CapturingOrderMetrics, OrderMetrics, RecorderOrderMetrics};
pub use products::{ClientError, HttpProductClient, InMemoryProductCatalog, ProductClient};
pub use publisher::{EventPublisher, InMemoryEventBus, LoggingEventPublisher, PublishError};
pub use service::{CreateOrder, NewOrderItem, OrchestratorConfig, OrderOrchestrator};
