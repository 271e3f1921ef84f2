//! Error type definitions.
//!
//! This module defines the errors surfaced to callers of the dispatcher, the
//! transport error taxonomy and initialization errors.

use std::sync::Arc;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::config::ConfigError;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The engine configuration was rejected.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Kinds of failures a transport can report.
///
/// The first group are network (socket level) failures, the second group are
/// application failures reported on top of a working connection. Both feed the
/// outcome history in the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum TransportErrorKind {
    // Network failures
    Timeout,
    ConnectionReset,
    ConnectionRefused,
    PoolExhausted,
    BadStatusLine,
    TlsHandshake,
    // Application failures
    HttpStatus, // 4xx/5xx reported as a failure by the transport
    ProxyFailure,
    AuthFailure,
    // Anything the transport could not classify
    Other,
}

impl TransportErrorKind {
    /// Socket-level failures; these raise the host timeout.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            TransportErrorKind::Timeout
                | TransportErrorKind::ConnectionReset
                | TransportErrorKind::ConnectionRefused
                | TransportErrorKind::PoolExhausted
                | TransportErrorKind::BadStatusLine
                | TransportErrorKind::TlsHandshake
                | TransportErrorKind::Other
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::PoolExhausted => "connection pool exhausted",
            TransportErrorKind::BadStatusLine => "bad HTTP status line",
            TransportErrorKind::TlsHandshake => "TLS handshake failure",
            TransportErrorKind::HttpStatus => "HTTP error status",
            TransportErrorKind::ProxyFailure => "proxy failure",
            TransportErrorKind::AuthFailure => "authentication failure",
            TransportErrorKind::Other => "unknown transport error",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed transport call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    status: Option<u16>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        TransportError {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// An application failure carrying the HTTP status that caused it.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 => TransportErrorKind::AuthFailure,
            407 => TransportErrorKind::ProxyFailure,
            _ => TransportErrorKind::HttpStatus,
        };
        TransportError {
            kind,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Human readable root cause when the failure is a known one.
    ///
    /// `None` means the transport could not classify the error; a scan stopped by
    /// such an error reports the recent failure messages instead.
    pub fn reason(&self) -> Option<String> {
        match self.kind {
            TransportErrorKind::Other => None,
            TransportErrorKind::HttpStatus => Some(match self.status {
                Some(status) => format!("HTTP error status {status}"),
                None => self.kind.as_str().to_string(),
            }),
            kind => Some(kind.as_str().to_string()),
        }
    }

    /// The string stored on failed outcome records.
    pub fn reason_or_message(&self) -> String {
        self.reason().unwrap_or_else(|| self.message.clone())
    }
}

/// A scan-wide, terminal condition.
///
/// Once installed it is returned by every subsequent send until the scan state is
/// cleared.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScanStopError {
    /// The user stopped the scan.
    #[error("The user stopped the scan.")]
    UserRequest,

    /// Too many consecutive errors with an identified root cause.
    #[error("{message}")]
    KnownReason {
        /// Detailed description
        message: String,
        /// Root cause derived from the terminating transport error
        reason: String,
    },

    /// Too many consecutive errors without a single identifiable cause.
    #[error("{message}")]
    UnknownReason {
        /// Detailed description
        message: String,
        /// Reasons of the last failures, oldest first
        errors: Vec<String>,
    },
}

/// Errors returned by the dispatcher.
#[derive(Error, Debug, Clone)]
pub enum RequestError {
    /// A single request failed; retries were exhausted or disabled.
    /// The scan as a whole keeps going.
    #[error("HTTP {method} {url} failed: {reason}")]
    Transient {
        /// HTTP method of the failed request
        method: String,
        /// Target URL of the failed request
        url: String,
        /// Reason of the last failure
        reason: String,
        /// Kind of the last failure
        kind: TransportErrorKind,
    },

    /// The URL scheme can not be sent by this engine.
    #[error("Unsupported URL: \"{0}\"")]
    UnsupportedUrl(String),

    /// A raw request could not be parsed.
    #[error("Invalid raw HTTP request: {0}")]
    InvalidRawRequest(String),

    /// The scan must stop. Every caller receives the same instance.
    #[error("{0}")]
    ScanMustStop(Arc<ScanStopError>),
}

impl RequestError {
    /// Whether the error is scan-wide rather than tied to one request.
    pub fn is_scan_fatal(&self) -> bool {
        matches!(self, RequestError::ScanMustStop(_))
    }

    /// The sticky stop error, if this is one.
    pub fn stop_error(&self) -> Option<&Arc<ScanStopError>> {
        match self {
            RequestError::ScanMustStop(err) => Some(err),
            _ => None,
        }
    }
}
