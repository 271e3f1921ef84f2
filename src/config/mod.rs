//! Engine configuration and constants.
//!
//! This module provides:
//! - Tuning constants (timeouts, thresholds, cooldowns)
//! - The engine configuration struct
//! - The command line configuration and logging option types

mod cli;
mod constants;
mod types;

// Re-export all constants
pub use cli::ScanConfig;
pub use constants::*;
pub use types::{ConfigError, EngineConfig, LogFormat, LogLevel};
