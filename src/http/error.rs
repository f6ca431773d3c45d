//! Handler error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors a handler can return.
///
/// `Fault` is the explicit form of an unrecoverable handler failure. It is
/// not reported to the client as-is: the recovery middleware picks up the
/// [`HandlerFault`] marker and answers with a plain 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("handler fault: {0}")]
    Fault(String),

    #[error("failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Response extension marking a 500 produced by a handler fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fault(message) => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response.extensions_mut().insert(HandlerFault { message });
                response
            }
            ApiError::Encoding(e) => {
                tracing::error!(error = %e, "Couldn't encode response body");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
