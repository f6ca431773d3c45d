//! Fault recovery middleware.
//!
//! The single boundary where a failed handler becomes a 500. Two kinds of
//! fault are recovered here:
//! - an explicit [`ApiError::Fault`](crate::http::ApiError::Fault) return,
//!   recognised by the [`HandlerFault`] response extension
//! - a panic unwinding out of the handler future
//!
//! Anything outside the request call (listener setup, connection I/O) is
//! not covered.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::http::error::HandlerFault;
use crate::http::request::request_id;

pub async fn recover_faults(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id(&request);
    let path = request.uri().path().to_string();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => match response.extensions().get::<HandlerFault>() {
            Some(fault) => {
                tracing::error!(
                    request_id = %request_id,
                    path = %path,
                    fault = %fault.message,
                    "Handler fault recovered"
                );
                internal_server_error()
            }
            None => response,
        },
        Err(payload) => {
            tracing::error!(
                request_id = %request_id,
                path = %path,
                panic = %panic_message(payload.as_ref()),
                "Handler panic recovered"
            );
            internal_server_error()
        }
    }
}

fn internal_server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiError;
    use axum::{body::to_bytes, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn panics() -> &'static str {
        panic!("handler exploded")
    }

    async fn faults() -> Result<&'static str, ApiError> {
        Err(ApiError::Fault("explicit".into()))
    }

    fn app() -> Router {
        Router::new()
            .route("/panic", get(panics))
            .route("/fault", get(faults))
            .route("/ok", get(|| async { "fine" }))
            .layer(middleware::from_fn(recover_faults))
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn panic_becomes_500() {
        assert_eq!(
            call("/panic").await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".into())
        );
    }

    #[tokio::test]
    async fn explicit_fault_becomes_500() {
        assert_eq!(
            call("/fault").await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".into())
        );
    }

    #[tokio::test]
    async fn normal_responses_pass_through() {
        assert_eq!(call("/ok").await, (StatusCode::OK, "fine".into()));
    }

    #[test]
    fn extracts_panic_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
