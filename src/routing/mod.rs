//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     loader.rs (configured + file routes)  ─┐
//!     handlers.rs (built-in routes)         ─┴→ dispatcher.rs
//!     → conflict checks → frozen axum Router
//!
//! Request:
//!     method + path → matched handler
//!                   → fallback.rs (not found)
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Loaded routes go in first, built-ins after; a clash fails startup
//! - The bearer gate is attached per route, never globally

pub mod dispatcher;
pub mod fallback;
pub mod handlers;
pub mod loader;

pub use dispatcher::{Access, Dispatcher, RouteError};
pub use fallback::{JsonNotFound, NotFoundHandler};
pub use loader::{ConfiguredRouteLoader, RouteLoader};
