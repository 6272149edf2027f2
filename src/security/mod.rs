//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every response:
//!     → headers.rs (hardening headers)
//!
//! Every request (last stage before dispatch):
//!     → client.rs (derive client key)
//!     → rate_limit.rs (fixed-window admission)
//!
//! Protected routes only:
//!     → auth.rs (bearer credential presence)
//! ```

pub mod auth;
pub mod client;
pub mod headers;
pub mod rate_limit;

pub use rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiter, WindowPolicy};
