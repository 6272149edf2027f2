//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware chain)
//!     → middleware/ (cors, logging, formatting, timeout)
//!     → [security gates] (rate limit, per-route bearer check)
//!     → [routing dispatcher picks handler]
//!     → error.rs (failures rendered as JSON)
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod server;

pub use error::{ErrorEnvelope, GatewayError, GatewayResult};
pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer};
