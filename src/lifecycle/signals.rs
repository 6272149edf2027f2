//! OS signal and fault handling.
//!
//! # Responsibilities
//! - Listen for SIGTERM/SIGINT (Ctrl+C elsewhere) from process start
//! - Log every panic; a panic on the main thread ends the process with 1
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Panics in spawned tasks are logged only; the task's `JoinHandle`
//!   carries the failure to whoever awaits it

use std::future::Future;
use std::io;
use std::thread::{self, ThreadId};

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::http::error::panic_message;

/// SIGINT and SIGTERM listeners, registered when constructed.
///
/// A signal that arrives after `install` but before the first `recv` is
/// kept and reported by that `recv`, so create this before any slow work.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolve when the process is asked to terminate. Returns the signal name.
    pub async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            "ctrl-c"
        }
    }

    /// Run `work` unless a termination signal arrives first.
    pub async fn until<F: Future>(&mut self, work: F) -> Result<F::Output, &'static str> {
        tokio::select! {
            output = work => Ok(output),
            signal = self.recv() => Err(signal),
        }
    }
}

/// Install the process panic hook. Call from the main thread.
pub fn install_fault_handlers() {
    let main_thread = thread::current().id();
    std::panic::set_hook(Box::new(move |info| {
        let message = panic_message(info.payload());
        let location = info
            .location()
            .map(|location| location.to_string())
            .unwrap_or_default();

        if is_fatal(main_thread) {
            tracing::error!(%message, %location, "Unhandled panic on main thread, exiting");
            std::process::exit(1);
        }
        tracing::error!(
            %message,
            %location,
            thread = thread::current().name().unwrap_or("unnamed"),
            "Unhandled panic in background task"
        );
    }));
}

fn is_fatal(main_thread: ThreadId) -> bool {
    thread::current().id() == main_thread
}
