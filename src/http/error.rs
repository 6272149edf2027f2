//! Error normalization.
//!
//! Every failure on the request path is a [`GatewayError`]. Structured errors
//! carry their own status and message into the envelope; anything else is
//! rendered as a generic 500 and the detail only goes to the log.
//!
//! The two gates (rate limit, bearer check) answer with a bare
//! `{ "error": ... }` body rather than the full envelope. Clients in the field
//! parse that shape.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const TIMEOUT_MESSAGE: &str = "Response timeout";

/// Uniform error body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEnvelope {
    pub error: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            status: status.as_u16(),
            timestamp: timestamp(),
        }
    }
}

/// Body returned by gate rejections.
#[derive(Debug, Serialize)]
struct GateRejection {
    error: &'static str,
}

/// Failure surfaced by a handler or middleware stage.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Expected, client-facing condition with an explicit status.
    #[error("{message}")]
    Structured { status: StatusCode, message: String },

    /// Anything unexpected. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,

    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    #[error("request exceeded its deadline")]
    Timeout,
}

impl GatewayError {
    pub fn structured(status: StatusCode, message: impl Into<String>) -> Self {
        GatewayError::Structured {
            status,
            message: message.into(),
        }
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        GatewayError::Internal(detail.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Structured { status, .. } => *status,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GatewayError::Structured { message, .. } => {
                (status, Json(ErrorEnvelope::new(status, message))).into_response()
            }
            GatewayError::Timeout => {
                (status, Json(ErrorEnvelope::new(status, TIMEOUT_MESSAGE))).into_response()
            }
            GatewayError::Internal(detail) => {
                tracing::error!(error = %detail, "Unhandled failure");
                (status, Json(ErrorEnvelope::new(status, INTERNAL_ERROR_MESSAGE))).into_response()
            }
            GatewayError::RateLimited => (
                status,
                Json(GateRejection {
                    error: RATE_LIMITED_MESSAGE,
                }),
            )
                .into_response(),
            GatewayError::Unauthorized => (
                status,
                Json(GateRejection {
                    error: UNAUTHORIZED_MESSAGE,
                }),
            )
                .into_response(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Panic handler for `CatchPanicLayer`: a panic is an unstructured failure.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    GatewayError::Internal(format!("panic: {}", panic_message(payload.as_ref()))).into_response()
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_structured_error_envelope() {
        let response =
            GatewayError::structured(StatusCode::BAD_REQUEST, "Invalid player ID").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid player ID");
        assert_eq!(body["status"], 400);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = GatewayError::internal("connection reset by peer").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["status"], 500);
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_gate_rejections_use_bare_body() {
        let body = body_json(GatewayError::RateLimited.into_response()).await;
        assert_eq!(body, serde_json::json!({ "error": "Too many requests" }));

        let response = GatewayError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Unauthorized" })
        );
    }

    #[tokio::test]
    async fn test_timeout_is_structured() {
        let response = GatewayError::Timeout.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"], TIMEOUT_MESSAGE);
        assert_eq!(body["status"], 503);
    }

    #[tokio::test]
    async fn test_panic_payloads() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
