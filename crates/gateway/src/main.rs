//! Gateway entry point.

use std::sync::Arc;

use common::ServicePorts;
use common::ports::service;
use gateway::{
    GatewayRouter, HttpDownstream, RecorderGatewayMetrics, RouteTable, create_app, default_routes,
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

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Resolve the gateway's listen port; without one we must not serve
    let mut ports = ServicePorts::with_defaults();
    let port = match ports.resolve(service::API_GATEWAY) {
        Ok(port) => port,
        Err(err) => {
            tracing::error!(error = %err, "port resolution failed, refusing to start");
            std::process::exit(1);
        }
    };

    // 4. Build the route table and router
    let table = RouteTable::new(default_routes(&ports));
    let router = Arc::new(GatewayRouter::new(
        table,
        Arc::new(HttpDownstream::new()),
        Arc::new(RecorderGatewayMetrics),
    ));

    // 5. Serve
    let app = create_app(router, metrics_handle);
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "starting API gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("gateway shut down gracefully");
}
