//! Cross-cutting middleware stages.
//!
//! Outer to inner, as composed by `server.rs`:
//! ```text
//! cors → request id + access log → security headers → pretty json → timeout → rate limit
//! ```
//! The rate limit gate lives in `security::rate_limit`, the header stage in
//! `security::headers`.

pub mod cors;
pub mod logging;
pub mod pretty_json;
pub mod timeout;
