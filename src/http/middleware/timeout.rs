//! Request deadline.
//!
//! Handling that outlives the deadline is dropped and the client gets a
//! timeout failure. Side effects already issued by the handler are not undone.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::error::GatewayError;

#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

pub async fn enforce_timeout(
    State(RequestTimeout(limit)): State<RequestTimeout>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => Ok(response),
        Err(_) => {
            tracing::warn!(
                path = %path,
                timeout_ms = limit.as_millis() as u64,
                "Request timed out"
            );
            Err(GatewayError::Timeout)
        }
    }
}
