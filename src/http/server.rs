//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from the dispatcher
//! - Wire up the middleware chain in its fixed order
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Middleware order (outer to inner)
//! ```text
//! catch panic (error normalizer for panics)
//!   → cors
//!   → request id → trace span → access log
//!   → security headers
//!   → pretty json
//!   → timeout
//!   → rate limit
//!   → dispatcher
//! ```
//! Later stages rely on earlier ones having run; e.g. a 429 from the rate
//! limiter still leaves through the header, formatting and logging stages.

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::collaborators::CatalogGenerator;
use crate::config::{loader::ConfigError, GatewayConfig};
use crate::http::error::panic_response;
use crate::http::middleware::{
    cors::cors_layer,
    logging::access_log,
    pretty_json::pretty_print_json,
    timeout::{enforce_timeout, RequestTimeout},
};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::routing::{Dispatcher, NotFoundHandler};
use crate::security::headers::with_security_headers;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogGenerator>,
    pub not_found: Arc<dyn NotFoundHandler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogGenerator>, not_found: Arc<dyn NotFoundHandler>) -> Self {
        Self {
            catalog,
            not_found,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Create a new HTTP server from a fully populated dispatcher.
    pub fn new(
        config: &GatewayConfig,
        dispatcher: Dispatcher,
        state: AppState,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        let router = Self::build_router(config, dispatcher, state, limiter)?;
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &GatewayConfig,
        dispatcher: Dispatcher,
        state: AppState,
        limiter: Arc<RateLimiter>,
    ) -> Result<Router, ConfigError> {
        let inner = ServiceBuilder::new()
            .layer(middleware::from_fn(pretty_print_json))
            .layer(middleware::from_fn_with_state(
                RequestTimeout(config.timeouts.request()),
                enforce_timeout,
            ))
            .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

        let cors = cors_layer(&config.cors)?;

        let router = dispatcher.into_router().with_state(state).layer(inner);
        // Outer layers are applied one at a time (innermost first) so each
        // stage sees an `axum::body::Body`, which CORS requires to be `Default`.
        Ok(with_security_headers(router)
            .layer(middleware::from_fn(access_log))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(cors)
            .layer(CatchPanicLayer::custom(panic_response)))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
