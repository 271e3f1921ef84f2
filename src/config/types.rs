//! Configuration types.
//!
//! This module defines the engine configuration and the logging enums used by the
//! command line front-end.

use std::time::Duration;

use clap::ValueEnum;
use thiserror::Error;

use crate::config::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, MAX_TIMEOUT, MIN_TIMEOUT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Errors reported by [`EngineConfig::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The worker pool bounds are inverted.
    #[error("Minimum worker count ({min}) is greater than the maximum ({max})")]
    WorkerBounds {
        /// Configured minimum
        min: usize,
        /// Configured maximum
        max: usize,
    },

    /// A pinned timeout outside the supported range.
    #[error("Timeout of {0:?} is outside the supported range")]
    TimeoutOutOfRange(Duration),

    /// A default header that can never be sent.
    #[error("Invalid default header: {0}")]
    InvalidHeader(String),
}

/// Request engine configuration.
///
/// Read-only from the engine's perspective. Constructed programmatically or from
/// the command line front-end.
///
/// # Examples
///
/// ```
/// use scan_dispatch::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig {
///     max_requests_per_second: 20,
///     configured_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User pinned timeout. `Duration::ZERO` enables timeout auto-adjustment.
    pub configured_timeout: Duration,

    /// Maximum outbound requests per second (0 disables rate limiting)
    pub max_requests_per_second: u32,

    /// Re-sends allowed after a failed attempt
    pub max_retries: u32,

    /// Smallest worker pool size the advisor may request
    pub min_workers: usize,

    /// Largest worker pool size the advisor may request
    pub max_workers: usize,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Headers added to every request (per-call headers take precedence)
    pub default_headers: Vec<(String, String)>,

    /// Domains whose responses are forwarded to the grep sink (empty = all)
    pub target_domains: Vec<String>,
}

impl EngineConfig {
    /// Timeout applied to hosts that have no per-host value yet.
    pub fn default_timeout(&self) -> Duration {
        if self.timeout_is_pinned() {
            self.configured_timeout
        } else {
            DEFAULT_TIMEOUT
        }
    }

    /// Whether the user disabled timeout auto-adjustment by pinning a value.
    pub fn timeout_is_pinned(&self) -> bool {
        !self.configured_timeout.is_zero()
    }

    /// Checks the configuration for values the engine cannot honor.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_workers > self.max_workers {
            return Err(ConfigError::WorkerBounds {
                min: self.min_workers,
                max: self.max_workers,
            });
        }

        if self.timeout_is_pinned()
            && (self.configured_timeout < MIN_TIMEOUT || self.configured_timeout > MAX_TIMEOUT)
        {
            return Err(ConfigError::TimeoutOutOfRange(self.configured_timeout));
        }

        for (name, value) in &self.default_headers {
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err()
                || reqwest::header::HeaderValue::from_str(value).is_err()
            {
                return Err(ConfigError::InvalidHeader(format!("{name}: {value}")));
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            configured_timeout: Duration::ZERO,
            max_requests_per_second: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: Vec::new(),
            target_domains: Vec::new(),
        }
    }
}
