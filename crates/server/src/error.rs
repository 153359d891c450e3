// crates/server/src/error.rs
//! Maps every error kind from spec §7 onto an HTTP response. Each variant
//! logs via `tracing` at construction time and never leaks internal detail
//! for `Internal`.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            retry_after_secs: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
            retry_after_secs: None,
        }
    }
}

/// The §7 error kinds, each owning the HTTP status it surfaces as.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("circuit open: {0}")]
    CircuitOpen(String),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("internal error")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::InvalidInput(msg) => {
                tracing::warn!(message = %msg, "invalid input");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("invalid_input", msg.clone()),
                )
            }
            ApiError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "rate limited");
                let mut body = ErrorResponse::new("rate_limited");
                body.retry_after_secs = Some(*retry_after_secs);
                (StatusCode::TOO_MANY_REQUESTS, body)
            }
            ApiError::CircuitOpen(name) => {
                tracing::warn!(breaker = %name, "circuit open with no fallback");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("circuit_open", name.clone()),
                )
            }
            ApiError::DependencyUnavailable(msg) => {
                tracing::error!(message = %msg, "dependency unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("dependency_unavailable", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new("internal"))
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn extract(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn invalid_input_maps_to_400() {
        let (status, body) = extract(ApiError::InvalidInput("too short".into()).into_response()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_input");
    }

    #[tokio::test]
    async fn rate_limited_carries_retry_after() {
        let (status, body) =
            extract(ApiError::RateLimited { retry_after_secs: 7 }.into_response()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.retry_after_secs, Some(7));
    }

    #[tokio::test]
    async fn internal_never_leaks_message() {
        let (status, body) = extract(ApiError::Internal("secret detail".into()).into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal");
        assert!(body.details.is_none());
    }
}
