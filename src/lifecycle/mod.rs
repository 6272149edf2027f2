//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Start → ConnectStorage → LoadRoutes → RegisterBuiltins
//!           → AcceptingTraffic → optional subsystems (subsystems.rs)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain within grace → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → exit immediately, or drain when a grace period is set
//!     panic on main thread → exit 1
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod subsystems;

pub use shutdown::{DrainOutcome, Shutdown};
pub use startup::{start, Collaborators, LifecyclePhase, RunningGateway, StartupError};
pub use subsystems::{
    ActivationReport, CommandSubsystem, Subsystem, SubsystemError, SubsystemRegistry,
};
