//! SignGate Common Utilities
//!
//! Shared infrastructure for all SignGate crates:
//! - Error types and result aliases
//! - Session clock and rate limiting
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
