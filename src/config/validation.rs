//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check origins and configured routes are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use axum::http::{HeaderValue, Method, StatusCode};

use crate::config::schema::{GatewayConfig, RouteDefinition};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be non-zero"));
    }
    if config.storage.url.trim().is_empty() {
        errors.push(ValidationError::new("storage.url", "must not be empty"));
    }
    if config.storage.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "storage.connect_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than zero"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_requests",
            "must be greater than zero",
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    let origins = config.cors.origins();
    if origins.len() > 1 && origins.contains(&"*") {
        errors.push(ValidationError::new(
            "cors.allowed_origins",
            "'*' cannot be combined with explicit origins",
        ));
    }
    for origin in origins.iter().filter(|origin| **origin != "*") {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::new(
                "cors.allowed_origins",
                format!("'{origin}' is not a valid origin"),
            ));
        }
    }

    for (index, route) in config.routes.static_routes.iter().enumerate() {
        for message in check_route(route) {
            errors.push(ValidationError::new(format!("routes.static[{index}]"), message));
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("'{addr}' is not a socket address"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Problems with a single route definition. Shared with the route loader so
/// file-sourced definitions get the same checks.
pub fn check_route(route: &RouteDefinition) -> Vec<String> {
    let mut problems = Vec::new();

    if parse_method(&route.method).is_none() {
        problems.push(format!("unsupported method '{}'", route.method));
    }
    if !route.path.starts_with('/') {
        problems.push(format!("path '{}' must start with '/'", route.path));
    }
    if StatusCode::from_u16(route.status).is_err() {
        problems.push(format!("invalid status {}", route.status));
    }

    problems
}

/// Parse one of the standard request methods, case-insensitively.
pub fn parse_method(method: &str) -> Option<Method> {
    let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).ok()?;
    match method {
        Method::GET
        | Method::POST
        | Method::PUT
        | Method::DELETE
        | Method::PATCH
        | Method::HEAD
        | Method::OPTIONS => Some(method),
        _ => None,
    }
}
