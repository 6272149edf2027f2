//! Built-in route handlers.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use sysinfo::{ProcessesToUpdate, System};

use crate::http::error::{timestamp, GatewayError, GatewayResult};
use crate::http::server::AppState;
use crate::routing::dispatcher::{Access, Dispatcher, RouteError};

pub const CATALOG_PATH: &str = "/fortnite/api/storefront/v2/catalog";
pub const PLAYER_STATS_PATH: &str = "/fortnite/api/player/{playerId}/stats";
pub const SERVICE_NAME: &str = "Game Backend Gateway";
pub const MIN_PLAYER_ID_LEN: usize = 3;

/// Register the built-in routes.
pub fn register_builtins(dispatcher: &mut Dispatcher) -> Result<(), RouteError> {
    dispatcher
        .route(Method::GET, "/", Access::Public, root)?
        .route(Method::GET, "/health", Access::Public, health)?
        .route(Method::GET, CATALOG_PATH, Access::Public, catalog)?
        .route(Method::GET, PLAYER_STATS_PATH, Access::Bearer, player_stats)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    /// Resident set size of this process in MiB.
    pub used: u64,
    /// Physical memory of the host in MiB.
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub service: &'static str,
    pub status: &'static str,
    pub uptime: f64,
    pub memory: Option<MemoryUsage>,
    pub timestamp: String,
    pub version: &'static str,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        service: SERVICE_NAME,
        status: "online",
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory: process_memory(),
        timestamp: timestamp(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn process_memory() -> Option<MemoryUsage> {
    const MIB: u64 = 1024 * 1024;

    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_memory();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = system.process(pid)?;

    Some(MemoryUsage {
        used: process.memory() / MIB,
        total: system.total_memory() / MIB,
    })
}

/// Liveness only: storage is reported as connected without probing it.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "database": "connected",
        "timestamp": timestamp(),
    }))
}

pub async fn catalog(State(state): State<AppState>) -> GatewayResult<Response> {
    let catalog = state.catalog.generate().await.ok_or_else(|| {
        GatewayError::structured(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate shop catalog",
        )
    })?;

    Ok((
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=300")),
            (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        Json(catalog),
    )
        .into_response())
}

pub async fn player_stats(
    player_id: Result<Path<String>, PathRejection>,
) -> GatewayResult<Json<Value>> {
    let invalid = || GatewayError::structured(StatusCode::BAD_REQUEST, "Invalid player ID");
    let Path(player_id) = player_id.map_err(|_| invalid())?;
    if player_id.chars().count() < MIN_PLAYER_ID_LEN {
        return Err(invalid());
    }

    Ok(Json(json!({
        "playerId": player_id,
        "stats": {
            "matchesPlayed": 0,
            "wins": 0,
            "top10": 0,
            "top25": 0,
            "kills": 0,
        },
        "lastUpdated": timestamp(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_memory_fits_in_host_memory() {
        let memory = process_memory().unwrap();
        assert!(memory.total > 0);
        assert!(memory.used <= memory.total);
    }
}
