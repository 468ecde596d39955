//! Error taxonomy and the uniform failure envelope.
//!
//! Every failing request, whatever module it came from, leaves the service
//! through [`Error::into_response`] as
//! `{"success": false, "status_code": N, "error": "..."}`. Store failures
//! and other unexpected errors are logged server-side and masked with a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur while handling a request.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// The action violates a state precondition.
    #[error("{0}")]
    Conflict(String),

    /// Authenticated, but the role/ownership check failed.
    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    /// No valid credentials on the request.
    #[error("authentication credentials were not provided or are invalid")]
    Unauthenticated,

    /// Unknown id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Notification transport failure. Terminal; nothing is retried.
    #[error("failed to send email: {0}")]
    Transport(String),

    /// Store failure. Masked at the boundary.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl Error {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Transport(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internals never reach the caller; the underlying error is logged
        // for diagnosis instead.
        let message = match &self {
            Error::Store(e) => {
                tracing::error!(error = %e, "store error while handling request");
                "internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                }
                other.to_string()
            }
        };

        let body = json!({
            "success": false,
            "status_code": status.as_u16(),
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            Error::Conflict("book not available".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::NotFound("book").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Transport("connection refused".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_are_masked() {
        let err = Error::Store(sqlx::Error::PoolClosed);
        // The Display impl still carries detail for logs...
        assert!(err.to_string().contains("store error"));
        // ...but the mapped status is a generic 500.
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn response_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn failure_envelope_carries_success_and_status() {
        let response =
            Error::Conflict("this book is not available for borrowing".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = response_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["status_code"], json!(409));
        assert_eq!(
            body["error"],
            json!("this book is not available for borrowing")
        );
    }

    #[tokio::test]
    async fn store_detail_never_reaches_the_body() {
        let response = Error::Store(sqlx::Error::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["status_code"], json!(500));
        assert_eq!(body["error"], json!("internal server error"));
    }
}
