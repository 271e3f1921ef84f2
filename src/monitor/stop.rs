//! Scan stop detection.
//!
//! A scan stops when the last `MAX_ERROR_COUNT` outcomes are one success
//! followed only by failures, and the site root does not answer a probe. Any
//! other shape (fewer records, an interleaved success, the run not starting
//! with a success) keeps the scan alive.

use std::time::Duration;

use log::{debug, warn};

use crate::config::MAX_ERROR_COUNT;
use crate::dispatcher::HttpRequest;
use crate::error_handling::{ScanStopError, TransportError};
use crate::history::{OutcomeRecord, OutcomeWindow};
use crate::transport::ReachabilityProbe;

const STOP_MESSAGE: &str = "Too many consecutive errors were found while performing HTTP \
requests. In most cases this means that the remote web server is not reachable anymore, \
the network is down, or a WAF is blocking the scan.";

/// Whether `records` is exactly one success followed by
/// `MAX_ERROR_COUNT - 1` failures.
pub fn is_stop_pattern(records: &[OutcomeRecord]) -> bool {
    match records.split_first() {
        Some((first, rest)) => {
            records.len() == MAX_ERROR_COUNT
                && first.is_successful()
                && rest.iter().all(|r| !r.is_successful())
        }
        None => false,
    }
}

/// Decides whether the scan must stop.
///
/// Must be called with the history lock held (the caller passes the locked
/// window), which guarantees at most one probe per detected regression. A
/// successful probe appends a success record to break the run of failures.
pub async fn should_stop_scan(
    window: &mut OutcomeWindow,
    last_request: &HttpRequest,
    probe: &dyn ReachabilityProbe,
    probe_timeout: Duration,
) -> bool {
    let last_records = window.last_n(MAX_ERROR_COUNT);
    if !is_stop_pattern(&last_records) {
        return false;
    }

    let base_url = last_request.base_url();
    debug!(
        "{} consecutive errors, probing {} (timeout {:.2}s)",
        MAX_ERROR_COUNT - 1,
        base_url,
        probe_timeout.as_secs_f64()
    );

    if probe.is_root_reachable(&base_url, probe_timeout).await {
        debug!("{} is still reachable, the scan continues", base_url);
        window.record(OutcomeRecord::unmeasured_success(last_request.host()));
        return false;
    }

    warn!("{} did not answer the reachability probe", base_url);
    true
}

/// Builds the terminal error from the transport error that tipped the scan over.
///
/// A classified error yields [`ScanStopError::KnownReason`]; otherwise the
/// reasons of the last `MAX_ERROR_COUNT` records are attached to an
/// [`ScanStopError::UnknownReason`].
pub fn build_stop_error(error: &TransportError, window: &OutcomeWindow) -> ScanStopError {
    let message = format!("{} The last error was \"{}\".", STOP_MESSAGE, error);

    match error.reason() {
        Some(reason) => ScanStopError::KnownReason { message, reason },
        None => ScanStopError::UnknownReason {
            message,
            errors: window
                .last_n(MAX_ERROR_COUNT)
                .iter()
                .map(|r| r.reason().to_string())
                .collect(),
        },
    }
}
