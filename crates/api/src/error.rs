//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::OrchestratorError;

/// API-level error type that maps to HTTP responses.
///
/// Every response body is a structured `{error, kind}` envelope; internal
/// faults are logged server-side and never leak details to the caller.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Resource not found.
    NotFound(String),
    /// An orchestrator operation failed.
    Orchestrator(OrchestratorError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, &'static str, String) {
    match &err {
        OrchestratorError::Validation(_)
        | OrchestratorError::ItemUnavailable { .. }
        | OrchestratorError::InvalidTransition { .. } => {
            (StatusCode::BAD_REQUEST, err.kind(), err.to_string())
        }
        OrchestratorError::NotFound(_) => (StatusCode::NOT_FOUND, err.kind(), err.to_string()),
        OrchestratorError::Conflict { .. } => (StatusCode::CONFLICT, err.kind(), err.to_string()),
        OrchestratorError::PersistenceFailed(_) => {
            // Storage details stay in the log; the caller gets a stable kind.
            tracing::error!(error = %err, "order operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.kind(),
                "order could not be persisted".to_string(),
            )
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}
