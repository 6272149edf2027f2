//! Request/response access log.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::security::client::client_key;

pub async fn access_log(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_key(request.headers());
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;
    let status = response.status();
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    if status.is_server_error() {
        tracing::warn!(
            request_id = %request_id,
            client = %client,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms,
            "Request failed"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            client = %client,
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms,
            "Request completed"
        );
    }

    metrics::record_request(method.as_str(), status.as_u16(), started);
    response
}
