//! Cross-origin policy.
//!
//! Methods and headers are fixed; origins come from configuration. A wildcard
//! origin is served by mirroring the request origin, since credentialed
//! requests cannot be answered with a literal `*`.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{loader::ConfigError, validation::ValidationError, CorsConfig};

pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
];

pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, ConfigError> {
    let origin = if config.allows_any() {
        AllowOrigin::mirror_request()
    } else {
        let origins = config
            .origins()
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    ConfigError::Validation(vec![ValidationError {
                        field: "cors.allowed_origins".into(),
                        message: format!("'{origin}' is not a valid origin"),
                    }])
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, X_REQUESTED_WITH])
        .allow_credentials(true))
}
