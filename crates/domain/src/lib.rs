//! Domain layer for the order platform.
//!
//! This crate provides:
//! - The `Order`/`OrderItem` model with its pricing invariants
//! - The `OrderStatus` state machine and the orthogonal `PaymentStatus`
//!   machine
//! - The `OrderStore` trait with an in-memory implementation backed by a
//!   version-checked arena (orders keyed by id, items owned by their order)

pub mod error;
pub mod order;
pub mod store;

pub use error::OrderError;
pub use order::{Money, Order, OrderItem, OrderStatus, PaymentStatus, ProductId};
pub use store::{InMemoryOrderStore, OrderStore, Page, PageInfo, StoreError};
