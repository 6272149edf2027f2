//! Edge gateway binary.
//!
//! ```text
//! signal listeners → load config → tracing → fault handlers → metrics exporter
//!     → lifecycle::start (storage, routes, built-ins, listener, subsystems)
//!     → wait for a termination signal
//! ```
//!
//! A termination signal at any point after the listeners are installed
//! exits 0, including while startup is still running.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use edge_gateway::config::{self, RuntimeMode};
use edge_gateway::lifecycle::{self, signals, Collaborators, SubsystemRegistry};
use edge_gateway::observability::{logging::init_tracing, metrics::init_metrics};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "HTTP edge gateway for the game backend", long_about = None)]
struct Cli {
    /// TOML configuration file. Environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut termination = match signals::TerminationSignals::install() {
        Ok(listeners) => listeners,
        Err(e) => {
            init_tracing(RuntimeMode::Development);
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let config = match config::loader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(RuntimeMode::Development);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.server.mode);
    signals::install_fault_handlers();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address(),
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => {
                tracing::error!(metrics_address = %address, error = %e, "Invalid metrics address")
            }
        }
    }

    let collaborators = Collaborators::from_config(&config);
    let subsystems = SubsystemRegistry::from_config(&config.subsystems);
    let startup = lifecycle::start(&config, collaborators, subsystems);
    let mut gateway = match termination.until(startup).await {
        Ok(Ok(gateway)) => gateway,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
        Err(signal) => {
            tracing::info!(signal, "Termination signal received during startup");
            // Route loading may still hold a blocking thread.
            std::process::exit(0);
        }
    };
    tracing::info!(
        address = %gateway.local_addr(),
        storage = gateway.storage().endpoint(),
        storage_connected_at = %gateway.storage().connected_at(),
        "Gateway ready"
    );

    tokio::select! {
        signal = termination.recv() => {
            tracing::info!(signal, "Termination signal received");
        }
        result = gateway.stopped() => {
            return match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "Server stopped unexpectedly");
                    ExitCode::FAILURE
                }
            };
        }
    }

    let grace = config.lifecycle.shutdown_grace();
    if grace.is_zero() {
        tracing::info!("Exiting without draining");
        std::process::exit(0);
    }

    let outcome = gateway.shutdown(grace).await;
    tracing::info!(?outcome, "Shutdown complete");
    ExitCode::SUCCESS
}
