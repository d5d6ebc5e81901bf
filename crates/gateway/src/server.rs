//! HTTP edge of the gateway.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use common::CorrelationId;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{GatewayError, RouteFailure};
use crate::forward::ProxyRequest;
use crate::router::GatewayRouter;

/// Largest request body the gateway will buffer for relaying.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Creates the gateway's Axum application: health and metrics endpoints,
/// with every other path handed to the relay.
pub fn create_app(gateway: Arc<GatewayRouter>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_endpoint))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health))
        .fallback(relay)
        .with_state(gateway)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// GET /health — returns gateway health status.
async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse { status: "ok" })
}

/// GET /metrics — returns Prometheus-formatted metrics.
async fn metrics_endpoint(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}

/// Fallback handler: relays everything the gateway itself doesn't serve.
async fn relay(
    State(gateway): State<Arc<GatewayRouter>>,
    request: axum::extract::Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                &err.to_string(),
                None,
            );
        }
    };

    let proxy_request = ProxyRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: bytes,
    };

    match gateway.route(proxy_request).await {
        Ok(relayed) => {
            let mut response = Response::new(Body::from(relayed.body));
            *response.status_mut() = relayed.status;
            *response.headers_mut() = relayed.headers;
            response
        }
        Err(failure) => failure_response(failure),
    }
}

fn failure_response(failure: RouteFailure) -> Response {
    let status = match failure.error {
        GatewayError::NoRoute => StatusCode::NOT_FOUND,
        GatewayError::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Downstream(_) => StatusCode::BAD_GATEWAY,
    };
    error_response(
        status,
        failure.error.kind(),
        &failure.error.to_string(),
        Some(failure.correlation_id),
    )
}

fn error_response(
    status: StatusCode,
    kind: &str,
    message: &str,
    correlation_id: Option<CorrelationId>,
) -> Response {
    let body = serde_json::json!({ "error": message, "kind": kind });
    let mut response = (status, axum::Json(body)).into_response();
    if let Some(id) = correlation_id
        && let Ok(value) = HeaderValue::try_from(id.to_string())
    {
        response.headers_mut().insert(CorrelationId::HEADER, value);
    }
    response
}
