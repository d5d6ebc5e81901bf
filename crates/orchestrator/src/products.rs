//! Product service client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{Money, ProductId};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the product service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service could not be reached or answered with an error.
    #[error("product service unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline.
    #[error("product service timed out")]
    Timeout,
}

/// Synchronous request/response facade over the product service.
///
/// Called per line item during order creation; the orchestrator converts any
/// failure into an `ItemUnavailable` rejection.
#[async_trait]
pub trait ProductClient: Send + Sync {
    /// Returns true if `quantity` units of the product can be ordered.
    async fn check_availability(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, ClientError>;

    /// Returns the product's current price.
    async fn get_price(&self, product_id: ProductId) -> Result<Money, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    #[allow(dead_code)]
    id: ProductId,
    #[allow(dead_code)]
    name: String,
    /// Price in cents.
    price: i64,
}

/// HTTP implementation talking to the product service's REST API.
pub struct HttpProductClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductClient {
    /// Creates a client for the product service at `base_url`, with every
    /// call bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn map_err(err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl ProductClient for HttpProductClient {
    async fn check_availability(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, ClientError> {
        let url = format!(
            "{}/api/products/{}/availability?quantity={}",
            self.base_url, product_id, quantity
        );
        let response = self.client.get(&url).send().await.map_err(Self::map_err)?;
        Ok(response.status().is_success())
    }

    async fn get_price(&self, product_id: ProductId) -> Result<Money, ClientError> {
        let url = format!("{}/api/products/{}", self.base_url, product_id);
        let response = self.client.get(&url).send().await.map_err(Self::map_err)?;

        if !response.status().is_success() {
            return Err(ClientError::Unavailable(format!(
                "product lookup returned {}",
                response.status()
            )));
        }

        let product: ProductDto = response.json().await.map_err(Self::map_err)?;
        Ok(Money::from_cents(product.price))
    }
}

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    price: Money,
    stock: u32,
}

#[derive(Default)]
struct CatalogState {
    entries: HashMap<ProductId, CatalogEntry>,
    fail_requests: bool,
    response_delay: Option<Duration>,
}

/// In-memory product catalog for testing.
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product with the given price and stock level.
    pub fn add_product(&self, product_id: ProductId, price: Money, stock: u32) {
        self.state
            .write()
            .unwrap()
            .entries
            .insert(product_id, CatalogEntry { price, stock });
    }

    /// Configures every call to fail, simulating an unreachable service.
    pub fn set_fail_requests(&self, fail: bool) {
        self.state.write().unwrap().fail_requests = fail;
    }

    /// Delays every response, for exercising call timeouts.
    pub fn set_response_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().response_delay = delay;
    }

    async fn simulate_transport(&self) -> Result<(), ClientError> {
        let (fail, delay) = {
            let state = self.state.read().unwrap();
            (state.fail_requests, state.response_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ClientError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductClient for InMemoryProductCatalog {
    async fn check_availability(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<bool, ClientError> {
        self.simulate_transport().await?;
        let state = self.state.read().unwrap();
        Ok(state
            .entries
            .get(&product_id)
            .is_some_and(|entry| entry.stock >= quantity))
    }

    async fn get_price(&self, product_id: ProductId) -> Result<Money, ClientError> {
        self.simulate_transport().await?;
        let state = self.state.read().unwrap();
        state
            .entries
            .get(&product_id)
            .map(|entry| entry.price)
            .ok_or_else(|| ClientError::Unavailable(format!("unknown product {product_id}")))
    }
}
