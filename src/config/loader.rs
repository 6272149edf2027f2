//! Configuration loading from disk and the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the runtime configuration: defaults, then the optional TOML file,
/// then `.env`, then the process environment.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => GatewayConfig::default(),
    };

    // Never overrides variables that are already set.
    if let Ok(dotenv_path) = dotenvy::dotenv() {
        tracing::debug!(path = %dotenv_path.display(), "Loaded .env file");
    }

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("PORT") {
        config.server.port = parse_env("PORT", &value)?;
    }
    if let Some(value) = get("HOST") {
        config.server.host = value;
    }
    if let Some(value) = get("GATEWAY_MODE") {
        config.server.mode = parse_env("GATEWAY_MODE", &value)?;
    }
    if let Some(value) = get("DATABASE_URL") {
        config.storage.url = value;
    }
    if let Some(value) = get("STORAGE_CONNECT_TIMEOUT_SECS") {
        config.storage.connect_timeout_secs = parse_env("STORAGE_CONNECT_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = get("JWT_SECRET") {
        config.auth.jwt_secret = Some(value);
    }
    if let Some(value) = get("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = value;
    }
    if let Some(value) = get("RATE_LIMIT_WINDOW_MS") {
        config.rate_limit.window_ms = parse_env("RATE_LIMIT_WINDOW_MS", &value)?;
    }
    if let Some(value) = get("RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = parse_env("RATE_LIMIT_MAX", &value)?;
    }
    if let Some(value) = get("REQUEST_TIMEOUT_SECS") {
        config.timeouts.request_secs = parse_env("REQUEST_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = get("ROUTES_DIR") {
        config.routes.directory = Some(PathBuf::from(value));
    }
    if let Some(value) = get("CATALOG_PATH") {
        config.catalog.path = Some(PathBuf::from(value));
    }
    if let Some(value) = get("SHUTDOWN_GRACE_SECS") {
        config.lifecycle.shutdown_grace_secs = parse_env("SHUTDOWN_GRACE_SECS", &value)?;
    }
    if let Some(value) = get("BOT_COMMAND") {
        config.subsystems.bot_command = Some(value);
    }
    if let Some(value) = get("MATCHMAKER_COMMAND") {
        config.subsystems.matchmaker_command = Some(value);
    }
    if let Some(value) = get("METRICS_ADDRESS") {
        config.observability.metrics_address = Some(value);
    }

    Ok(())
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::config::schema::RuntimeMode;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    /// The file layer alone, without `.env` or the process environment.
    fn load_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
        let config = read_file(path)?;
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("PORT", "8080"),
                ("GATEWAY_MODE", "production"),
                ("DATABASE_URL", "mongodb://db:27017/game"),
                ("JWT_SECRET", "secret"),
                ("ALLOWED_ORIGINS", "https://a.example,https://b.example"),
                ("RATE_LIMIT_MAX", "5"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.mode, RuntimeMode::Production);
        assert_eq!(config.storage.url, "mongodb://db:27017/game");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("secret"));
        assert_eq!(config.cors.origins().len(), 2);
        assert_eq!(config.rate_limit.max_requests, 5);
        // untouched
        assert_eq!(config.rate_limit.window_ms, 900_000);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(config.server.port, 5595);
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [server]
            port = 7000

            [rate_limit]
            window_ms = 1000
            max_requests = 3
            "#
        )
        .unwrap();

        let config = load_file(file.path()).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.rate_limit.max_requests, 3);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nmax_requests = 0").unwrap();

        let err = load_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
    }

    #[test]
    fn test_missing_file() {
        let err = load_file(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
