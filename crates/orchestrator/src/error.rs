//! Orchestrator error types.
//!
//! Business rejections and system faults are variants of one enum so callers
//! can't mistake one for the other; the API layer maps each variant to a
//! status code via [`OrchestratorError::kind`].

use common::OrderId;
use domain::{OrderError, OrderStatus, ProductId, StoreError};
use thiserror::Error;

/// Errors returned by order operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The request was malformed (no items, non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(OrderError),

    /// A requested product is unavailable in the requested quantity, or the
    /// product service could not be reached in time. Business rejection, not
    /// a system fault; nothing was persisted.
    #[error("product {product_id} is not available in the requested quantity")]
    ItemUnavailable { product_id: ProductId },

    /// No such order.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// The requested status change is not a legal transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A concurrent update won the race; retry with a fresh read.
    #[error("order {order_id} was modified concurrently")]
    Conflict { order_id: OrderId },

    /// The storage layer failed or timed out.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

impl OrchestratorError {
    /// Stable machine-readable error kind for structured responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Validation(_) => "validation",
            OrchestratorError::ItemUnavailable { .. } => "item_unavailable",
            OrchestratorError::NotFound(_) => "not_found",
            OrchestratorError::InvalidTransition { .. } => "invalid_transition",
            OrchestratorError::Conflict { .. } => "conflict",
            OrchestratorError::PersistenceFailed(_) => "persistence_failed",
        }
    }
}

impl From<OrderError> for OrchestratorError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { from, to } => {
                OrchestratorError::InvalidTransition { from, to }
            }
            other => OrchestratorError::Validation(other),
        }
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { order_id, .. } => {
                OrchestratorError::Conflict { order_id }
            }
            other => OrchestratorError::PersistenceFailed(other.to_string()),
        }
    }
}
