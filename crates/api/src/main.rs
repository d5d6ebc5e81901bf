//! Order API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::AppState;
use api::config::Config;
use common::ServicePorts;
use common::ports::service;
use domain::InMemoryOrderStore;
use orchestrator::{
    HttpProductClient, LoggingEventPublisher, OrchestratorConfig, OrderOrchestrator,
    RecorderOrderMetrics,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Resolve the listen port; without one we must not accept traffic
    let mut ports = ServicePorts::with_defaults();
    let port = match ports.resolve(service::ORDERS) {
        Ok(port) => port,
        Err(err) => {
            tracing::error!(error = %err, "port resolution failed, refusing to start");
            std::process::exit(1);
        }
    };

    // 4. Wire the orchestrator
    let product_service_url = config.product_service_url.clone().unwrap_or_else(|| {
        let product_port = ports
            .binding(service::PRODUCTS)
            .map(|binding| binding.current_port)
            .unwrap_or(5011);
        format!("http://127.0.0.1:{product_port}")
    });
    let products = HttpProductClient::new(product_service_url.as_str(), Duration::from_secs(2))
        .expect("failed to build product client");

    let orchestrator = OrderOrchestrator::new(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(products),
        Arc::new(LoggingEventPublisher),
        Arc::new(RecorderOrderMetrics),
        OrchestratorConfig::default(),
    );
    let state = Arc::new(AppState { orchestrator });

    // 5. Serve
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr(port);
    tracing::info!(%addr, %product_service_url, "starting order API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
