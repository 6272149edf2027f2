//! Route loading from configuration and route files.
//!
//! A route file is a JSON array of route definitions:
//! ```json
//! [
//!   { "method": "GET", "path": "/fortnite/api/version", "body": { "version": "1.0" } },
//!   { "method": "GET", "path": "/account/:accountId", "require_auth": true, "body": {} }
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::{validation, RouteDefinition};
use crate::routing::dispatcher::{Access, Dispatcher, RouteError};

/// Registers additional routes before the server accepts traffic.
pub trait RouteLoader: Send + Sync {
    fn load(&self, dispatcher: &mut Dispatcher) -> Result<(), RouteError>;
}

/// Loads static JSON routes from inline config and a route directory.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredRouteLoader {
    inline: Vec<RouteDefinition>,
    directory: Option<PathBuf>,
}

impl ConfiguredRouteLoader {
    pub fn new(inline: Vec<RouteDefinition>, directory: Option<PathBuf>) -> Self {
        Self { inline, directory }
    }

    /// Read every `*.json` file in `dir`, in file name order.
    fn read_directory(dir: &Path) -> Result<Vec<(String, Vec<RouteDefinition>)>, RouteError> {
        let source_error = |message: String| RouteError::Source {
            source_name: dir.display().to_string(),
            message,
        };

        let mut files = fs::read_dir(dir)
            .map_err(|e| source_error(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        files.sort();

        files
            .into_iter()
            .map(|path| {
                let name = path.display().to_string();
                let raw = fs::read_to_string(&path).map_err(|e| RouteError::Source {
                    source_name: name.clone(),
                    message: e.to_string(),
                })?;
                let definitions = serde_json::from_str(&raw).map_err(|e| RouteError::Source {
                    source_name: name.clone(),
                    message: e.to_string(),
                })?;
                Ok((name, definitions))
            })
            .collect()
    }
}

impl RouteLoader for ConfiguredRouteLoader {
    fn load(&self, dispatcher: &mut Dispatcher) -> Result<(), RouteError> {
        let mut sources = vec![("config".to_string(), self.inline.clone())];
        if let Some(dir) = &self.directory {
            sources.extend(Self::read_directory(dir)?);
        }

        for (source, definitions) in sources {
            for definition in definitions {
                register_static(dispatcher, &source, definition)?;
            }
        }

        tracing::info!(routes = dispatcher.len(), "Routes loaded");
        Ok(())
    }
}

fn register_static(
    dispatcher: &mut Dispatcher,
    source: &str,
    definition: RouteDefinition,
) -> Result<(), RouteError> {
    let problems = validation::check_route(&definition);
    if !problems.is_empty() {
        return Err(RouteError::Source {
            source_name: source.to_string(),
            message: problems.join(", "),
        });
    }

    let method = validation::parse_method(&definition.method)
        .ok_or_else(|| RouteError::UnsupportedMethod(definition.method.clone()))?;
    let status = StatusCode::from_u16(definition.status).unwrap_or(StatusCode::OK);
    let access = if definition.require_auth {
        Access::Bearer
    } else {
        Access::Public
    };
    let body = definition.body;

    tracing::debug!(source, method = %method, path = %definition.path, "Registering static route");
    dispatcher.route(method, &definition.path, access, move || {
        let body = body.clone();
        async move { static_response(status, body) }
    })?;
    Ok(())
}

fn static_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}
