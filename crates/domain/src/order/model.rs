//! The order model.
//!
//! Orders own their items outright: items live in a plain `Vec` inside the
//! order and carry no back-reference beyond the parent's id. Deleting or
//! rejecting an order takes its items with it.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;

use super::{Money, OrderStatus, PaymentStatus, ProductId};

/// A priced line item, created together with its order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Unique item identifier.
    pub id: Uuid,

    /// The order this item belongs to.
    pub order_id: OrderId,

    /// The product being ordered.
    pub product_id: ProductId,

    /// Quantity ordered; always positive.
    pub quantity: u32,

    /// Price per unit at order-creation time.
    pub unit_price: Money,

    /// `unit_price * quantity`, captured at creation.
    pub total_price: Money,
}

impl OrderItem {
    /// Creates a new line item, computing its total price.
    pub fn new(order_id: OrderId, product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            unit_price,
            total_price: unit_price.multiply(quantity),
        }
    }
}

/// An order row together with its owned items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// The user who placed the order.
    pub user_id: UserId,

    /// Current fulfillment status.
    pub status: OrderStatus,

    /// Current payment status, tracked orthogonally.
    pub payment_status: PaymentStatus,

    /// Sum of the items' total prices.
    pub total_amount: Money,

    /// Where the order ships to.
    pub shipping_address: String,

    /// Where the invoice goes.
    pub billing_address: String,

    /// The line items; never empty for a persisted order.
    pub items: Vec<OrderItem>,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last changed by a status update.
    pub updated_at: Option<DateTime<Utc>>,

    /// Carrier tracking number, once fulfillment assigns one.
    pub tracking_number: Option<String>,

    /// Optimistic concurrency token; bumped by the store on every update.
    pub version: u64,
}

impl Order {
    /// Creates a new order in `Pending`/`Pending` with the total computed
    /// from its items.
    pub fn new(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: impl Into<String>,
        billing_address: impl Into<String>,
    ) -> Self {
        let total_amount = items.iter().map(|i| i.total_price).sum();
        Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount,
            shipping_address: shipping_address.into(),
            billing_address: billing_address.into(),
            items,
            created_at: Utc::now(),
            updated_at: None,
            tracking_number: None,
            version: 1,
        }
    }

    /// Moves the order to `next`, stamping `updated_at`.
    ///
    /// Returns the previous status on success; the order is left untouched
    /// when the transition is illegal.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        let previous = self.status;
        self.status = next;
        self.updated_at = Some(Utc::now());
        Ok(previous)
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
