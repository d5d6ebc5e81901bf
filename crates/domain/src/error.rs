//! Domain error types.

use thiserror::Error;

use crate::order::{OrderStatus, ProductId};

/// Errors raised by order validation and state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// An order must contain at least one item.
    #[error("order has no items")]
    NoItems,

    /// Item quantities must be positive.
    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    /// The requested status change is not a legal transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
