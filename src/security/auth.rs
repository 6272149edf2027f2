//! Bearer credential gate.
//!
//! Applied per route. Only checks that an `Authorization` header with the
//! `Bearer ` prefix is present; the token itself is not validated.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::http::error::GatewayError;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Returns true when the request carries a bearer credential.
pub fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(BEARER_PREFIX))
}

pub async fn require_bearer(request: Request, next: Next) -> Result<Response, GatewayError> {
    if has_bearer(request.headers()) {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "Missing bearer credential");
        Err(GatewayError::Unauthorized)
    }
}
