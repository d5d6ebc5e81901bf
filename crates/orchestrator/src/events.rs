//! Domain event envelopes published to the message bus.
//!
//! Events are ephemeral: they are produced after a successful commit and
//! handed to the bus, which owns durability. Amounts travel in cents.

use chrono::{DateTime, Utc};
use common::CorrelationId;
use domain::{Order, OrderStatus};
use serde::Serialize;

/// Topics carrying order events.
pub mod topics {
    pub const ORDER_CREATED: &str = "order-created";
    pub const ORDER_STATUS_UPDATED: &str = "order-status-updated";
}

/// A domain event envelope.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    /// Destination topic.
    pub topic: &'static str,

    /// Correlation token of the operation that caused the event.
    pub correlation_id: CorrelationId,

    /// Flat JSON payload; shape depends on the topic.
    pub payload: serde_json::Value,

    /// When the causing operation committed.
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Builds an `order-created` event from a freshly committed order.
    pub fn order_created(order: &Order, correlation_id: CorrelationId) -> Self {
        let items: Vec<serde_json::Value> = order
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "productId": item.product_id,
                    "quantity": item.quantity,
                    "unitPrice": item.unit_price.cents(),
                })
            })
            .collect();

        Self {
            topic: topics::ORDER_CREATED,
            correlation_id,
            payload: serde_json::json!({
                "orderId": order.id,
                "userId": order.user_id,
                "totalAmount": order.total_amount.cents(),
                "items": items,
            }),
            occurred_at: Utc::now(),
        }
    }

    /// Builds an `order-status-updated` event carrying old and new status.
    pub fn order_status_updated(
        order: &Order,
        previous: OrderStatus,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            topic: topics::ORDER_STATUS_UPDATED,
            correlation_id,
            payload: serde_json::json!({
                "orderId": order.id,
                "previousStatus": previous.as_str(),
                "status": order.status.as_str(),
                "updatedAt": order.updated_at,
            }),
            occurred_at: Utc::now(),
        }
    }
}
