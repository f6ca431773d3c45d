//! Response construction.
//!
//! # Responsibilities
//! - Encode JSON bodies with an explicit `Content-Type`
//! - Surface encoding failures as `ApiError::Encoding` instead of panicking
//!
//! # Design Decisions
//! - Bodies are newline-terminated, one JSON document per response
//! - Encoding happens before the status line is chosen, so a failure still yields a clean 500

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;

use crate::http::error::ApiError;

/// Serialize `value` into a JSON response with the given status.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response, ApiError> {
    let mut body = serde_json::to_vec(value)?;
    body.push(b'\n');

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::ser::Error as _;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refused"))
        }
    }

    #[tokio::test]
    async fn encodes_json_with_content_type() {
        let response = json(StatusCode::OK, "Hello World!").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"\"Hello World!\"\n");
    }

    #[test]
    fn encoding_failure_is_reported() {
        let err = json(StatusCode::OK, &Unencodable).unwrap_err();
        assert!(matches!(err, ApiError::Encoding(_)));
    }
}
