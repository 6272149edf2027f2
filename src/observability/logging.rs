//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, human-readable format for development
//! - Log level configurable via `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RuntimeMode;

pub const DEFAULT_FILTER: &str = "edge_gateway=info,tower_http=info";

/// Install the global subscriber. Safe to call once per process.
pub fn init_tracing(mode: RuntimeMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match mode {
        RuntimeMode::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        RuntimeMode::Development => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
