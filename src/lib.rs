//! Edge gateway for a game backend.
//!
//! Every request passes a fixed middleware chain (CORS, logging, security
//! headers, JSON formatting, timeout, rate limit) before the route
//! dispatcher, and every failure leaves as JSON.

pub mod collaborators;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::{start, Collaborators, RunningGateway};
