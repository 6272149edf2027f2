//! Method + path dispatch table.
//!
//! # Responsibilities
//! - Collect routes from the route loader and the built-in handlers
//! - Reject duplicate or conflicting registrations with an error
//! - Freeze into an axum `Router` with the not-found fallback
//!
//! # Design Decisions
//! - Immutable after `into_router` (thread-safe without locks)
//! - `:param` segments are accepted and rewritten to `{param}`
//! - Unknown paths and known paths with an unregistered method both go to
//!   the not-found handler

use std::collections::{BTreeMap, HashMap, HashSet};

use axum::{
    extract::State,
    handler::Handler,
    http::{Method, Uri},
    middleware,
    response::Response,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};

use crate::http::server::AppState;
use crate::security::auth::require_bearer;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {method} {path} is already registered")]
    Conflict { method: Method, path: String },

    #[error("route {path} conflicts with {existing}: parameter names differ")]
    ParameterConflict { path: String, existing: String },

    #[error("invalid route path '{0}'")]
    InvalidPath(String),

    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),

    #[error("failed to load routes from {source_name}: {message}")]
    Source {
        source_name: String,
        message: String,
    },
}

/// Whether a route sits behind the bearer gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Bearer,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    endpoints: BTreeMap<String, MethodRouter<AppState>>,
    registered: HashSet<(Method, String)>,
    shapes: HashMap<String, String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` + `path`.
    pub fn route<H, T>(
        &mut self,
        method: Method,
        path: &str,
        access: Access,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let path = normalize_path(path)?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| RouteError::UnsupportedMethod(method.to_string()))?;

        if self.registered.contains(&(method.clone(), path.clone())) {
            return Err(RouteError::Conflict { method, path });
        }
        let shape = path_shape(&path);
        if let Some(existing) = self.shapes.get(&shape) {
            if *existing != path {
                return Err(RouteError::ParameterConflict {
                    path,
                    existing: existing.clone(),
                });
            }
        }

        let mut endpoint = on(filter, handler);
        if access == Access::Bearer {
            endpoint = endpoint.route_layer(middleware::from_fn(require_bearer));
        }

        let merged = match self.endpoints.remove(&path) {
            Some(existing) => existing.merge(endpoint),
            None => endpoint,
        };
        self.endpoints.insert(path.clone(), merged);
        self.shapes.insert(shape, path.clone());
        self.registered.insert((method, path));

        Ok(self)
    }

    pub fn contains(&self, method: &Method, path: &str) -> bool {
        normalize_path(path)
            .map(|path| self.registered.contains(&(method.clone(), path)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Build the router. Unmatched requests go to the state's not-found handler.
    pub fn into_router(self) -> Router<AppState> {
        let mut router = Router::new();
        for (path, endpoint) in self.endpoints {
            router = router.route(&path, endpoint);
        }
        router
            .fallback(not_found)
            .method_not_allowed_fallback(not_found)
    }
}

async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    state.not_found.respond(&method, uri.path())
}

/// Rewrite `:name` / `*name` segments to axum's `{name}` / `{*name}` syntax.
pub fn normalize_path(path: &str) -> Result<String, RouteError> {
    if !path.starts_with('/') {
        return Err(RouteError::InvalidPath(path.to_string()));
    }
    if path == "/" {
        return Ok(path.to_string());
    }

    let mut segments = Vec::new();
    for segment in path[1..].split('/') {
        let normalized = if let Some(name) = segment.strip_prefix(':') {
            format!("{{{name}}}")
        } else if let Some(name) = segment.strip_prefix('*') {
            format!("{{*{name}}}")
        } else {
            segment.to_string()
        };

        let param = normalized
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .map(|name| name.trim_start_matches('*'));
        match param {
            Some(name) if name.is_empty() || !is_identifier(name) => {
                return Err(RouteError::InvalidPath(path.to_string()));
            }
            None if normalized.contains(['{', '}', ':', '*']) => {
                return Err(RouteError::InvalidPath(path.to_string()));
            }
            _ => {}
        }
        segments.push(normalized);
    }

    Ok(format!("/{}", segments.join("/")))
}

fn is_identifier(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Path with parameter names erased, so `/a/{x}` and `/a/{y}` compare equal.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
