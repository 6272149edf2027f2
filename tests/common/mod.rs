//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use edge_gateway::collaborators::CatalogGenerator;
use edge_gateway::config::GatewayConfig;
use edge_gateway::http::{AppState, GatewayServer};
use edge_gateway::routing::{handlers::register_builtins, Dispatcher, JsonNotFound};
use edge_gateway::security::{RateLimiter, WindowPolicy};

/// Catalog collaborator returning a fixed result.
pub struct StubCatalog(pub Option<Value>);

#[async_trait]
impl CatalogGenerator for StubCatalog {
    async fn generate(&self) -> Option<Value> {
        self.0.clone()
    }
}

/// Config bound to an ephemeral loopback port.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".into();
    config.server.port = 0;
    config
}

/// The composed middleware chain over the built-in routes.
pub fn gateway_router(config: &GatewayConfig, catalog: Option<Value>) -> Router {
    gateway_router_with(config, catalog, |_| {})
}

/// Like `gateway_router`, registering extra routes before the built-ins.
pub fn gateway_router_with(
    config: &GatewayConfig,
    catalog: Option<Value>,
    extra: impl FnOnce(&mut Dispatcher),
) -> Router {
    let mut dispatcher = Dispatcher::new();
    extra(&mut dispatcher);
    register_builtins(&mut dispatcher).unwrap();

    let state = AppState::new(Arc::new(StubCatalog(catalog)), Arc::new(JsonNotFound));
    let limiter = Arc::new(RateLimiter::in_memory(WindowPolicy::from(&config.rate_limit)));
    GatewayServer::new(config, dispatcher, state, limiter)
        .unwrap()
        .router()
}

/// GET `path` as the client at `client_ip`.
pub fn get(path: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", client_ip)
        .body(Body::empty())
        .unwrap()
}

/// GET `path` with an `Authorization` header.
pub fn get_with_auth(path: &str, client_ip: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", client_ip)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap()
}

/// Send one request through the router and decode the JSON body.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}
