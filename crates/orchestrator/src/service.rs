//! The order orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{CorrelationId, OrderId, UserId};
use domain::{
    Money, Order, OrderError, OrderItem, OrderStatus, OrderStore, Page, PageInfo, ProductId,
    StoreError,
};
use futures_util::future::try_join_all;

use crate::error::OrchestratorError;
use crate::events::DomainEvent;
use crate::metrics::OrderMetrics;
use crate::products::ProductClient;
use crate::publisher::EventPublisher;

/// A requested line item, before pricing.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Command to create an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: String,
    pub billing_address: String,
}

/// Timeouts bounding every downstream call the orchestrator makes.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Deadline per product-service call during validation.
    pub validation_timeout: Duration,
    /// Deadline per storage call.
    pub store_timeout: Duration,
    /// Deadline for the best-effort publish attempt.
    pub publish_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            validation_timeout: Duration::from_secs(2),
            store_timeout: Duration::from_secs(2),
            publish_timeout: Duration::from_secs(1),
        }
    }
}

/// Drives the order-creation saga and status-transition propagation.
///
/// Creation validates every item against the product service before anything
/// is written (all-or-nothing: an unavailable item aborts with no row
/// created, so no compensation is needed), persists the order atomically,
/// and then publishes the creation event with best-effort semantics. Status
/// updates validate the transition, persist under the store's version check,
/// and publish the same way.
pub struct OrderOrchestrator {
    store: Arc<dyn OrderStore>,
    products: Arc<dyn ProductClient>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<dyn OrderMetrics>,
    config: OrchestratorConfig,
}

impl OrderOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        store: Arc<dyn OrderStore>,
        products: Arc<dyn ProductClient>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<dyn OrderMetrics>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            products,
            publisher,
            metrics,
            config,
        }
    }

    /// Creates an order for the user, validating and pricing every item
    /// against the product service.
    ///
    /// Prices are captured as observed at creation time and not re-validated
    /// later. Returns the persisted order in `Pending`.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, items = cmd.items.len()))]
    pub async fn create_order(
        &self,
        cmd: CreateOrder,
        correlation_id: CorrelationId,
    ) -> Result<Order, OrchestratorError> {
        let started = Instant::now();
        let result = self.create_order_inner(cmd, correlation_id).await;
        self.metrics
            .processing_time(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            self.metrics.order_error(err.kind());
        }
        result
    }

    async fn create_order_inner(
        &self,
        cmd: CreateOrder,
        correlation_id: CorrelationId,
    ) -> Result<Order, OrchestratorError> {
        if cmd.items.is_empty() {
            return Err(OrderError::NoItems.into());
        }
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id,
                }
                .into());
            }
        }

        // Items are independent; validate and price them concurrently. Any
        // unavailable item aborts the whole operation before persistence.
        let prices: Vec<Money> =
            try_join_all(cmd.items.iter().map(|item| self.validate_item(item))).await?;

        let order_id = OrderId::new();
        let items: Vec<OrderItem> = cmd
            .items
            .iter()
            .zip(prices)
            .map(|(item, price)| OrderItem::new(order_id, item.product_id, item.quantity, price))
            .collect();
        let order = Order::new(
            order_id,
            cmd.user_id,
            items,
            cmd.shipping_address,
            cmd.billing_address,
        );

        self.with_store_timeout(self.store.insert(order.clone()))
            .await?;

        self.metrics.order_created(order.status.as_str());
        tracing::info!(order_id = %order.id, total = %order.total_amount, "order created");

        self.publish_best_effort(DomainEvent::order_created(&order, correlation_id))
            .await;

        Ok(order)
    }

    /// Moves an order to a new status and propagates the change.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        correlation_id: CorrelationId,
    ) -> Result<Order, OrchestratorError> {
        let started = Instant::now();
        let result = self
            .update_status_inner(order_id, new_status, correlation_id)
            .await;
        self.metrics
            .processing_time(started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            self.metrics.order_error(err.kind());
        }
        result
    }

    async fn update_status_inner(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        correlation_id: CorrelationId,
    ) -> Result<Order, OrchestratorError> {
        let mut order = self
            .with_store_timeout(self.store.get(order_id))
            .await?
            .ok_or(OrchestratorError::NotFound(order_id))?;

        let previous = order.transition_to(new_status)?;
        let saved = self.with_store_timeout(self.store.update(order)).await?;

        self.metrics
            .status_changed(previous.as_str(), saved.status.as_str());
        tracing::info!(%order_id, from = %previous, to = %saved.status, "order status updated");

        self.publish_best_effort(DomainEvent::order_status_updated(
            &saved,
            previous,
            correlation_id,
        ))
        .await;

        Ok(saved)
    }

    /// Loads an order, scoped to the requesting user.
    pub async fn get_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, OrchestratorError> {
        let order = self.with_store_timeout(self.store.get(order_id)).await?;
        Ok(order.filter(|o| o.user_id == user_id))
    }

    /// Lists the user's orders, newest first.
    pub async fn list_orders(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        page: Page,
    ) -> Result<(Vec<Order>, PageInfo), OrchestratorError> {
        self.with_store_timeout(self.store.list(user_id, status, page))
            .await
    }

    /// Checks one item's availability and fetches its price, both bounded by
    /// the validation timeout. Timeouts and client errors count as
    /// unavailable.
    async fn validate_item(&self, item: &NewOrderItem) -> Result<Money, OrchestratorError> {
        let deadline = self.config.validation_timeout;
        let unavailable = OrchestratorError::ItemUnavailable {
            product_id: item.product_id,
        };

        let available = match tokio::time::timeout(
            deadline,
            self.products.check_availability(item.product_id, item.quantity),
        )
        .await
        {
            Ok(Ok(available)) => available,
            Ok(Err(err)) => {
                tracing::warn!(product_id = %item.product_id, error = %err, "availability check failed");
                false
            }
            Err(_) => {
                tracing::warn!(product_id = %item.product_id, "availability check timed out");
                false
            }
        };
        if !available {
            return Err(unavailable);
        }

        match tokio::time::timeout(deadline, self.products.get_price(item.product_id)).await {
            Ok(Ok(price)) => Ok(price),
            Ok(Err(err)) => {
                tracing::warn!(product_id = %item.product_id, error = %err, "price lookup failed");
                Err(unavailable)
            }
            Err(_) => {
                tracing::warn!(product_id = %item.product_id, "price lookup timed out");
                Err(unavailable)
            }
        }
    }

    /// Publishes with a bounded attempt. The order is already committed, so
    /// a failed or timed-out publish is logged and counted, never propagated;
    /// downstream consumers catch up whenever the bus recovers.
    async fn publish_best_effort(&self, event: DomainEvent) {
        let topic = event.topic;
        match tokio::time::timeout(self.config.publish_timeout, self.publisher.publish(event)).await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.metrics.order_error("publish_failed");
                tracing::warn!(topic, error = %err, "event publish failed; consumers will lag");
            }
            Err(_) => {
                self.metrics.order_error("publish_failed");
                tracing::warn!(topic, "event publish timed out; consumers will lag");
            }
        }
    }

    async fn with_store_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, OrchestratorError> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(OrchestratorError::PersistenceFailed(
                "storage call timed out".into(),
            )),
        }
    }
}
