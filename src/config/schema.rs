//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings and runtime mode.
    pub server: ServerConfig,

    /// Storage connection settings.
    pub storage: StorageConfig,

    /// Token settings.
    pub auth: AuthConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Request timeout.
    pub timeouts: TimeoutConfig,

    /// Additional routes registered at startup.
    pub routes: RoutesConfig,

    /// Shop catalog source.
    pub catalog: CatalogConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,

    /// Optional subsystem entry points.
    pub subsystems: SubsystemsConfig,

    /// Metrics exposition.
    pub observability: ObservabilityConfig,
}

/// Runtime mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RuntimeMode::Development),
            "production" | "prod" => Ok(RuntimeMode::Production),
            other => Err(format!(
                "expected 'development' or 'production', got '{other}'"
            )),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Listening port.
    pub port: u16,

    /// Development or production.
    pub mode: RuntimeMode,
}

impl ServerConfig {
    /// Socket address string for the listener (e.g., "0.0.0.0:5595").
    pub fn bind_address(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5595,
            mode: RuntimeMode::Development,
        }
    }
}

/// Storage connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Connection string (e.g., "mongodb://127.0.0.1:27017/gateway").
    pub url: String,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl StorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "mongodb://127.0.0.1:27017/gateway".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Token configuration.
///
/// The signing secret is carried for token validation; the bearer gate only
/// checks header presence today.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Cross-origin policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Comma-separated origin list, or "*" for any origin.
    pub allowed_origins: String,
}

impl CorsConfig {
    /// Split the configured list into trimmed, non-empty origins.
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    pub fn allows_any(&self) -> bool {
        let origins = self.origins();
        origins.is_empty() || origins == ["*"]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Fixed window length in milliseconds.
    pub window_ms: u64,

    /// Requests admitted per client per window.
    pub max_requests: u32,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total handling time) in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Sources of additional routes.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutesConfig {
    /// Directory of `*.json` files, each holding an array of route definitions.
    pub directory: Option<PathBuf>,

    /// Inline route definitions.
    #[serde(rename = "static")]
    pub static_routes: Vec<RouteDefinition>,
}

/// A route answering with a fixed JSON body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// HTTP method (e.g., "GET").
    pub method: String,

    /// Path; `:param` and `{param}` segments are both accepted.
    pub path: String,

    /// Response status code.
    #[serde(default = "default_route_status")]
    pub status: u16,

    /// Response body.
    #[serde(default)]
    pub body: serde_json::Value,

    /// Put the route behind the bearer gate.
    #[serde(default)]
    pub require_auth: bool,
}

fn default_route_status() -> u16 {
    200
}

/// Shop catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON file served as the catalog. When unset a generated daily
    /// storefront is served.
    pub path: Option<PathBuf>,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Drain period after a termination signal. Zero exits immediately.
    pub shutdown_grace_secs: u64,
}

impl LifecycleConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Optional subsystem entry points.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SubsystemsConfig {
    /// Command line launching the chat bot.
    pub bot_command: Option<String>,

    /// Command line launching the matchmaker.
    pub matchmaker_command: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Prometheus scrape listener address. Metrics export is off when unset.
    pub metrics_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.port, 5595);
        assert_eq!(config.server.bind_address(), "0.0.0.0:5595");
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.timeouts.request(), Duration::from_secs(30));
        assert!(config.cors.allows_any());
    }

    #[test]
    fn test_empty_toml_is_valid() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.mode, RuntimeMode::Development);
        assert!(config.routes.static_routes.is_empty());
    }

    #[test]
    fn test_static_routes_from_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[routes.static]]
            method = "GET"
            path = "/fortnite/api/version"
            body = { version = "1.0" }
            "#,
        )
        .unwrap();

        let route = &config.routes.static_routes[0];
        assert_eq!(route.status, 200);
        assert!(!route.require_auth);
        assert_eq!(route.body["version"], "1.0");
    }

    #[test]
    fn test_origin_list() {
        let cors = CorsConfig {
            allowed_origins: "https://a.example, https://b.example,".into(),
        };
        assert_eq!(cors.origins(), vec!["https://a.example", "https://b.example"]);
        assert!(!cors.allows_any());
    }

    #[test]
    fn test_secret_is_redacted() {
        let auth = AuthConfig {
            jwt_secret: Some("hunter2".into()),
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("PRODUCTION".parse::<RuntimeMode>(), Ok(RuntimeMode::Production));
        assert!("staging".parse::<RuntimeMode>().is_err());
    }
}
