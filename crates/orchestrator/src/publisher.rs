//! Event publication to the message bus.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::events::DomainEvent;

/// Errors from the message bus.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The bus rejected or failed to accept the event.
    #[error("publish to '{topic}' failed: {reason}")]
    Failed { topic: String, reason: String },
}

/// Fire-and-forget delivery of domain events to the message bus.
///
/// Delivery is at-least-once from the consumer's point of view; the bus owns
/// durability. The orchestrator never fails a user-facing operation on a
/// publish error.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hands an event to the bus.
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError>;
}

#[derive(Default)]
struct BusState {
    events: Vec<DomainEvent>,
    fail_on_publish: bool,
}

/// In-memory bus recording published events, for tests and default wiring.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<RwLock<BusState>>,
}

impl InMemoryEventBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the bus to reject the next publishes.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns every event published so far, in publish order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.state.read().unwrap().events.clone()
    }

    /// Returns the events published on one topic, in publish order.
    pub fn published_on(&self, topic: &str) -> Vec<DomainEvent> {
        self.state
            .read()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(PublishError::Failed {
                topic: event.topic.to_string(),
                reason: "broker connection lost".into(),
            });
        }
        state.events.push(event);
        Ok(())
    }
}

/// Publisher that writes events to the log instead of a broker.
///
/// Used by binaries running without bus infrastructure; consumers read the
/// structured log stream.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        tracing::info!(
            topic = event.topic,
            correlation_id = %event.correlation_id,
            payload = %event.payload,
            "domain event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::topics;
    use common::{CorrelationId, OrderId, UserId};
    use domain::{Money, Order, OrderItem, ProductId};

    fn sample_event() -> DomainEvent {
        let order_id = OrderId::new();
        let order = Order::new(
            order_id,
            UserId::new(),
            vec![OrderItem::new(
                order_id,
                ProductId::new(),
                1,
                Money::from_cents(500),
            )],
            "1 Ship St",
            "2 Bill Ave",
        );
        DomainEvent::order_created(&order, CorrelationId::new())
    }

    #[tokio::test]
    async fn bus_records_events_in_order() {
        let bus = InMemoryEventBus::new();
        bus.publish(sample_event()).await.unwrap();
        bus.publish(sample_event()).await.unwrap();

        assert_eq!(bus.published().len(), 2);
        assert_eq!(bus.published_on(topics::ORDER_CREATED).len(), 2);
        assert!(bus.published_on(topics::ORDER_STATUS_UPDATED).is_empty());
    }

    #[tokio::test]
    async fn failing_bus_rejects_publish() {
        let bus = InMemoryEventBus::new();
        bus.set_fail_on_publish(true);

        let result = bus.publish(sample_event()).await;
        assert!(matches!(result, Err(PublishError::Failed { .. })));
        assert!(bus.published().is_empty());
    }
}
