//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect storage and load routes before anything is reachable
//! - Register built-in routes and compose the middleware chain
//! - Bind the listener and begin accepting traffic
//! - Activate optional subsystems once the server is live
//!
//! # Design Decisions
//! - Fail fast: a storage or route failure ends startup before binding
//! - Phases run in order, never concurrently, and are never retried
//! - Listener starts last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collaborators::{
    CatalogGenerator, DailyCatalog, FileCatalog, StorageConnector, StorageError, StorageHandle,
    TcpStorageConnector,
};
use crate::config::{ConfigError, GatewayConfig};
use crate::http::server::{AppState, GatewayServer};
use crate::lifecycle::shutdown::{DrainOutcome, Shutdown};
use crate::lifecycle::subsystems::{ActivationReport, SubsystemRegistry};
use crate::routing::{
    handlers::register_builtins, ConfiguredRouteLoader, Dispatcher, JsonNotFound,
    NotFoundHandler, RouteError, RouteLoader,
};
use crate::security::{MemoryRateLimitStore, RateLimitStore, RateLimiter, WindowPolicy};

/// Startup phases, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecyclePhase {
    Start,
    ConnectStorage,
    LoadRoutes,
    RegisterBuiltins,
    AcceptingTraffic,
    SubsystemsActivated,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage connection failed: {0}")]
    Storage(#[from] StorageError),

    #[error("route loading failed: {0}")]
    Routes(#[source] RouteError),

    #[error("built-in route registration failed: {0}")]
    Builtins(#[source] RouteError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// The external boundaries the gateway core depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn StorageConnector>,
    pub routes: Arc<dyn RouteLoader>,
    pub catalog: Arc<dyn CatalogGenerator>,
    pub not_found: Arc<dyn NotFoundHandler>,
    pub rate_limit_store: Arc<dyn RateLimitStore>,
}

impl Collaborators {
    /// Default collaborators for a standalone deployment.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let catalog: Arc<dyn CatalogGenerator> = match &config.catalog.path {
            Some(path) => Arc::new(FileCatalog::new(path.clone())),
            None => Arc::new(DailyCatalog),
        };

        Self {
            storage: Arc::new(TcpStorageConnector::from_config(&config.storage)),
            routes: Arc::new(ConfiguredRouteLoader::new(
                config.routes.static_routes.clone(),
                config.routes.directory.clone(),
            )),
            catalog,
            not_found: Arc::new(JsonNotFound),
            rate_limit_store: Arc::new(MemoryRateLimitStore::new()),
        }
    }
}

/// A gateway that is accepting traffic.
pub struct RunningGateway {
    local_addr: SocketAddr,
    phase: watch::Receiver<LifecyclePhase>,
    storage: StorageHandle,
    shutdown: Shutdown,
    server: JoinHandle<io::Result<()>>,
    activation: Option<JoinHandle<ActivationReport>>,
}

impl RunningGateway {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase.clone()
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    /// Wait for subsystem activation to finish. `None` once already taken.
    pub async fn activation(&mut self) -> Option<ActivationReport> {
        let task = self.activation.take()?;
        task.await.ok()
    }

    /// Resolve when the server task ends on its own.
    pub async fn stopped(&mut self) -> io::Result<()> {
        match (&mut self.server).await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }

    /// Stop accepting and drain in-flight requests for up to `grace`.
    pub async fn shutdown(self, grace: Duration) -> DrainOutcome {
        tracing::info!(grace_secs = grace.as_secs(), "Graceful shutdown started");
        self.shutdown.drain(self.server, grace).await
    }
}

/// Run startup and return once the gateway accepts traffic.
pub async fn start(
    config: &GatewayConfig,
    collaborators: Collaborators,
    subsystems: SubsystemRegistry,
) -> Result<RunningGateway, StartupError> {
    let (phase, _) = watch::channel(LifecyclePhase::Start);
    start_observed(config, collaborators, subsystems, phase).await
}

/// `start`, publishing each phase on `phase` as it is entered.
pub async fn start_observed(
    config: &GatewayConfig,
    collaborators: Collaborators,
    subsystems: SubsystemRegistry,
    phase: watch::Sender<LifecyclePhase>,
) -> Result<RunningGateway, StartupError> {
    let enter = |next: LifecyclePhase| {
        tracing::debug!(phase = ?next, "Entering lifecycle phase");
        phase.send_replace(next);
    };
    enter(LifecyclePhase::Start);
    tracing::info!(mode = %config.server.mode, "Gateway starting");

    enter(LifecyclePhase::ConnectStorage);
    let storage = collaborators.storage.connect().await?;
    tracing::info!(endpoint = storage.endpoint(), "Storage connected");

    enter(LifecyclePhase::LoadRoutes);
    let mut dispatcher = load_routes(collaborators.routes).await?;

    enter(LifecyclePhase::RegisterBuiltins);
    register_builtins(&mut dispatcher).map_err(StartupError::Builtins)?;

    let limiter = Arc::new(RateLimiter::new(
        collaborators.rate_limit_store,
        WindowPolicy::from(&config.rate_limit),
    ));
    let state = AppState::new(collaborators.catalog, collaborators.not_found);
    let server = GatewayServer::new(config, dispatcher, state, limiter)?;

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address,
        source,
    })?;

    let shutdown = Shutdown::new();
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));
    enter(LifecyclePhase::AcceptingTraffic);
    tracing::info!(address = %local_addr, "Accepting traffic");

    let observer = phase.subscribe();
    let activation = tokio::spawn(async move {
        let report = subsystems.activate_all().await;
        phase.send_replace(LifecyclePhase::SubsystemsActivated);
        report
    });

    Ok(RunningGateway {
        local_addr,
        phase: observer,
        storage,
        shutdown,
        server,
        activation: Some(activation),
    })
}

/// Route sources may touch the filesystem, so they run on the blocking pool.
async fn load_routes(routes: Arc<dyn RouteLoader>) -> Result<Dispatcher, StartupError> {
    let loaded = tokio::task::spawn_blocking(move || {
        let mut dispatcher = Dispatcher::new();
        routes.load(&mut dispatcher).map(|()| dispatcher)
    })
    .await
    .map_err(|e| {
        StartupError::Routes(RouteError::Source {
            source_name: "route loader".to_string(),
            message: e.to_string(),
        })
    })?;
    loaded.map_err(StartupError::Routes)
}
