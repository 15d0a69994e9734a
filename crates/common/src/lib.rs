//! CardioMotion Common Utilities
//!
//! Shared infrastructure for all CardioMotion crates:
//! - Error types and result aliases
//! - Cooperative cancellation tokens
//! - Tracing/logging initialization
//! - Configuration loading (analysis defaults, optical-flow parameters)

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;

pub use cancel::*;
pub use config::*;
pub use error::*;
