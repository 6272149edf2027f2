//! Pretty-printing of JSON response bodies.

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::http::error::GatewayError;

pub const JSON_INDENT_BODY_LIMIT: usize = 8 * 1024 * 1024;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Declared body length from `Content-Length`, else the body's exact size.
fn declared_len(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .or_else(|| response.body().size_hint().upper())
}

/// Re-serialize JSON responses with two-space indentation.
///
/// Bodies that fail to parse, or that are larger than
/// `JSON_INDENT_BODY_LIMIT`, are passed through unchanged.
pub async fn pretty_print_json(request: Request, next: Next) -> Result<Response, GatewayError> {
    let response = next.run(request).await;
    if !is_json(response.headers()) {
        return Ok(response);
    }
    if declared_len(&response).is_some_and(|len| len > JSON_INDENT_BODY_LIMIT as u64) {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, JSON_INDENT_BODY_LIMIT)
        .await
        .map_err(GatewayError::internal)?;

    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => match serde_json::to_vec_pretty(&value) {
            Ok(pretty) => Body::from(pretty),
            Err(_) => Body::from(bytes),
        },
        Err(_) => Body::from(bytes),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Ok(Response::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::Request, middleware, routing::get, Json, Router};
    use tower::ServiceExt;

    async fn call(app: Router) -> String {
        let response = app
            .layer(middleware::from_fn(pretty_print_json))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_json_is_indented() {
        let app = Router::new().route(
            "/",
            get(|| async { Json(serde_json::json!({ "status": "healthy" })) }),
        );
        assert_eq!(call(app).await, "{\n  \"status\": \"healthy\"\n}");
    }

    #[tokio::test]
    async fn test_oversized_json_passes_through() {
        let blob = "x".repeat(JSON_INDENT_BODY_LIMIT + 1);
        let expected = serde_json::to_string(&serde_json::json!({ "blob": blob })).unwrap();
        let app = Router::new().route(
            "/",
            get(move || {
                let blob = blob.clone();
                async move { Json(serde_json::json!({ "blob": blob })) }
            }),
        );
        assert_eq!(call(app).await, expected);
    }

    #[tokio::test]
    async fn test_other_content_untouched() {
        let app = Router::new().route("/", get(|| async { "{\"raw\":true}" }));
        assert_eq!(call(app).await, "{\"raw\":true}");
    }
}
