//! Shutdown coordination for the gateway.

use std::io;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// How a graceful shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request finished and the server task exited.
    Drained,
    /// The grace period ran out first.
    GraceElapsed,
}

/// Coordinator for graceful shutdown.
///
/// The server task subscribes once at startup; `drain` fires the broadcast and
/// waits for that task within a bounded grace period.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell subscribers to stop accepting new work.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown and wait up to `grace` for `server` to finish.
    pub async fn drain(
        &self,
        server: JoinHandle<io::Result<()>>,
        grace: Duration,
    ) -> DrainOutcome {
        self.trigger();

        match tokio::time::timeout(grace, server).await {
            Ok(Ok(Ok(()))) => DrainOutcome::Drained,
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Server exited with an error while draining");
                DrainOutcome::Drained
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Server task failed while draining");
                DrainOutcome::Drained
            }
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed before drain");
                DrainOutcome::GraceElapsed
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
