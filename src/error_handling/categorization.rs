//! Error categorization and retry strategy.
//!
//! This module maps errors raised by the HTTP client into the transport error
//! taxonomy used by the retry policy and the outcome history.

use std::error::Error as StdError;
use std::io::ErrorKind as IoErrorKind;
use std::time::Duration;

use tokio_retry::strategy::FixedInterval;

use super::stats::ErrorStats;
use super::types::{TransportError, TransportErrorKind};

/// Creates the resend strategy for a failed request.
///
/// Failed requests are re-sent right away: the host timeout already grew with
/// the failure, and the error-rate pause throttles a degrading target. The
/// iterator yields `max_retries` delays, so a request makes at most
/// `1 + max_retries` attempts.
pub fn get_retry_strategy(max_retries: u32) -> impl Iterator<Item = Duration> {
    FixedInterval::new(Duration::ZERO).take(max_retries as usize)
}

/// Categorizes a `reqwest::Error` into a `TransportError`.
///
/// HTTP status errors (only produced when the caller asked for
/// `error_for_status`) become application failures; everything else is
/// classified by walking the error chain for I/O and TLS causes.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> TransportError {
    let message = error.to_string();

    if let Some(status) = error.status() {
        return TransportError::http_status(status.as_u16(), message);
    }

    if error.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, message);
    }

    if let Some(kind) = categorize_source_chain(error) {
        return TransportError::new(kind, message);
    }

    if error.is_connect() {
        // Connection errors whose cause we could not pin down
        TransportError::new(TransportErrorKind::ConnectionRefused, message)
    } else if error.is_body() || error.is_decode() {
        TransportError::new(TransportErrorKind::BadStatusLine, message)
    } else {
        TransportError::new(TransportErrorKind::Other, message)
    }
}

/// Looks through the error sources for a cause we know how to name.
fn categorize_source_chain(error: &(dyn StdError + 'static)) -> Option<TransportErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);

    while let Some(cause) = current {
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            if let Some(kind) = categorize_io_error(io_err.kind()) {
                return Some(kind);
            }
        }

        let msg = cause.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("handshake") || msg.contains("tls") {
            return Some(TransportErrorKind::TlsHandshake);
        }
        if msg.contains("invalid http") || msg.contains("invalid status") {
            return Some(TransportErrorKind::BadStatusLine);
        }

        current = cause.source();
    }

    None
}

/// Maps an I/O error kind to a transport failure kind.
pub fn categorize_io_error(kind: IoErrorKind) -> Option<TransportErrorKind> {
    match kind {
        IoErrorKind::TimedOut => Some(TransportErrorKind::Timeout),
        IoErrorKind::ConnectionReset
        | IoErrorKind::ConnectionAborted
        | IoErrorKind::BrokenPipe
        | IoErrorKind::UnexpectedEof => Some(TransportErrorKind::ConnectionReset),
        IoErrorKind::ConnectionRefused
        | IoErrorKind::AddrNotAvailable
        | IoErrorKind::NotConnected => Some(TransportErrorKind::ConnectionRefused),
        IoErrorKind::InvalidData => Some(TransportErrorKind::BadStatusLine),
        _ => None,
    }
}

/// Updates failure statistics for a transport error.
pub fn update_error_stats(stats: &ErrorStats, error: &TransportError) {
    stats.increment(error.kind());
}
