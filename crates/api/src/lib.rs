//! HTTP API for the order service.
//!
//! Exposes order creation, lookup, listing, and status updates over REST,
//! with structured logging (tracing) and Prometheus metrics. All order
//! semantics live in the orchestrator; this crate maps HTTP to commands and
//! error kinds to status codes.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::InMemoryOrderStore;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{
    InMemoryEventBus, InMemoryProductCatalog, OrchestratorConfig, OrderOrchestrator,
    RecorderOrderMetrics,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: OrderOrchestrator,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Handles onto the in-memory collaborators behind a default state, so tests
/// can seed the catalog, inspect the bus, and inject faults.
pub struct StateHandles {
    pub store: InMemoryOrderStore,
    pub catalog: InMemoryProductCatalog,
    pub bus: InMemoryEventBus,
}

/// Creates application state wired to in-memory collaborators.
pub fn create_default_state() -> (Arc<AppState>, StateHandles) {
    let store = InMemoryOrderStore::new();
    let catalog = InMemoryProductCatalog::new();
    let bus = InMemoryEventBus::new();

    let orchestrator = OrderOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(catalog.clone()),
        Arc::new(bus.clone()),
        Arc::new(RecorderOrderMetrics),
        OrchestratorConfig::default(),
    );

    let state = Arc::new(AppState { orchestrator });
    let handles = StateHandles {
        store,
        catalog,
        bus,
    };
    (state, handles)
}
