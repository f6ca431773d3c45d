//! Endpoint handlers.

use axum::{extract::State, http::StatusCode, response::Response};

use crate::health::StatusReporter;
use crate::http::error::ApiError;
use crate::http::response;

/// `GET /api/v1/` — the JSON string `"Hello World!"`.
pub async fn hello() -> Result<Response, ApiError> {
    response::json(StatusCode::OK, "Hello World!")
}

/// `ANY /api/v2/` — always faults, to exercise the recovery boundary.
pub async fn fault() -> Result<Response, ApiError> {
    Err(ApiError::Fault("Panic at the disco".to_string()))
}

/// `GET /api/v1/health/full` — full status history, oldest first.
pub async fn health_full(State(status): State<StatusReporter>) -> Result<Response, ApiError> {
    response::json(StatusCode::OK, &status.snapshot())
}

/// Fallback for unmatched paths: 404 with no body.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
