//! The order store.
//!
//! Orders live in an arena keyed by id; each order owns its items. Updates
//! carry the version the caller loaded, and the store rejects the write when
//! the stored row has moved on. That version check is the backstop against
//! lost updates from concurrent status changes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::order::{Order, OrderStatus};

/// Errors that can occur when reading or writing orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row changed under the caller; the write was not applied.
    #[error("version conflict for order {order_id}: expected {expected}, found {actual}")]
    VersionConflict {
        order_id: OrderId,
        expected: u64,
        actual: u64,
    },

    /// An order with this id already exists.
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    /// The storage backend failed or timed out.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A page request, 1-based.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    page: u32,
    page_size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 100;

    /// Creates a page request, clamping out-of-range values.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn number(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * (self.page_size as usize)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// Pagination metadata returned alongside a listing, serialized into the
/// `x-pagination` response header by the API layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_items: usize,
    pub page_size: u32,
    pub current_page: u32,
    pub total_pages: u32,
}

impl PageInfo {
    fn for_page(total_items: usize, page: Page) -> Self {
        let total_pages = total_items.div_ceil(page.size() as usize) as u32;
        Self {
            total_items,
            page_size: page.size(),
            current_page: page.number(),
            total_pages,
        }
    }
}

/// Persistence contract for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and its items as one atomic unit.
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    /// Loads an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Writes back a modified order.
    ///
    /// `order.version` must be the version the caller loaded; the stored row
    /// gets its version bumped on success. Returns the stored order.
    async fn update(&self, order: Order) -> Result<Order, StoreError>;

    /// Lists a user's orders, optionally filtered by status, newest first.
    async fn list(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<(Vec<Order>, PageInfo), StoreError>;
}

#[derive(Default)]
struct InMemoryState {
    orders: HashMap<OrderId, Order>,
    fail_on_write: bool,
}

/// In-memory order store.
///
/// Backs the tests and the default wiring; provides the same version-checked
/// contract a database-backed store would.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail writes, for exercising fault paths.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }

        state.orders.insert(order.id, order);
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn update(&self, order: Order) -> Result<Order, StoreError> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }

        let stored = state.orders.get_mut(&order.id).ok_or_else(|| {
            StoreError::Unavailable(format!("order {} vanished during update", order.id))
        })?;

        if stored.version != order.version {
            return Err(StoreError::VersionConflict {
                order_id: order.id,
                expected: order.version,
                actual: stored.version,
            });
        }

        let mut updated = order;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<(Vec<Order>, PageInfo), StoreError> {
        let state = self.state.read().await;

        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let info = PageInfo::for_page(matching.len(), page);
        let rows = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size() as usize)
            .cloned()
            .collect();

        Ok((rows, info))
    }
}
