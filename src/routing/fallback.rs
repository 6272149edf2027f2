//! Not-found handling for unmatched method + path pairs.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::error::GatewayError;

pub trait NotFoundHandler: Send + Sync {
    fn respond(&self, method: &Method, path: &str) -> Response;
}

/// Answers with the standard error envelope and status 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNotFound;

impl NotFoundHandler for JsonNotFound {
    fn respond(&self, method: &Method, path: &str) -> Response {
        tracing::debug!(method = %method, path = %path, "No route matched");
        GatewayError::structured(
            StatusCode::NOT_FOUND,
            format!("Route not found: {method} {path}"),
        )
        .into_response()
    }
}
