//! FormCoach Common Utilities
//!
//! Shared infrastructure for all FormCoach crates:
//! - Error types and result aliases
//! - Session clock, interval gating, and FPS measurement
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
