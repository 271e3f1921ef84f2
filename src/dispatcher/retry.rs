//! Bounded retries with outcome recording and stop evaluation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use tokio_retry::RetryIf;

use super::request::HttpRequest;
use super::response::HttpResponse;
use super::state::ScanControl;
use crate::config::PROBE_TIMEOUT_MULT;
use crate::error_handling::{
    get_retry_strategy, update_error_stats, ErrorStats, RequestError, ScanStopError,
    TransportError,
};
use crate::history::{OutcomeHistory, OutcomeRecord};
use crate::monitor::{build_stop_error, should_stop_scan};
use crate::timeout::TimeoutController;
use crate::transport::{ReachabilityProbe, Transport};

/// Sends one request, retrying failed attempts up to `max_retries` times.
///
/// Resends run through `tokio_retry::RetryIf` with the strategy from
/// [`get_retry_strategy`]. A stop error or `skip_retry` ends the retries early.
/// Every network attempt leaves exactly one record in the history (unless the
/// request opted out with `skip_retry`). After each failure the stop pattern is checked
/// while the history lock is held; the first sender to detect it probes the
/// target and installs the stop error, later senders find it installed.
pub(crate) struct RetryPolicy<'a> {
    pub transport: &'a dyn Transport,
    pub probe: &'a dyn ReachabilityProbe,
    pub history: &'a OutcomeHistory,
    pub timeouts: &'a TimeoutController,
    pub control: &'a ScanControl,
    pub error_stats: &'a ErrorStats,
    pub max_retries: u32,
}

impl RetryPolicy<'_> {
    /// Timeout for the next attempt: the per-call override, else the current
    /// per-host value.
    pub async fn effective_timeout(&self, request: &HttpRequest) -> Duration {
        match request.options().timeout {
            Some(timeout) => timeout,
            None => self.timeouts.get_timeout(&request.host()).await,
        }
    }

    pub async fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let skip_retry = request.options().skip_retry;

        RetryIf::spawn(
            get_retry_strategy(self.max_retries),
            move || self.attempt(request, attempts),
            |error: &RequestError| !skip_retry && !error.is_scan_fatal(),
        )
        .await
    }

    /// One network attempt. Failures come back as `Transient` unless the
    /// scan must stop.
    async fn attempt(
        &self,
        request: &HttpRequest,
        attempts: &AtomicU32,
    ) -> Result<HttpResponse, RequestError> {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        if attempt > 0 {
            debug!(
                "Re-sending {} {} (retry {} of {})",
                request.method(),
                request.url(),
                attempt,
                self.max_retries
            );
        }

        if let Some(stop) = self.control.stop_error().await {
            return Err(RequestError::ScanMustStop(stop));
        }

        let host = request.host();
        let timeout = self.effective_timeout(request).await;
        let error = match self.transport.do_request(request, timeout).await {
            Ok(response) => {
                // Cache hits never touched the network
                if !response.from_cache() {
                    self.history
                        .record(OutcomeRecord::success(&host, response.rtt()))
                        .await;
                }
                return Ok(response);
            }
            Err(error) => error,
        };

        if request.options().skip_retry {
            debug!(
                "{} {} failed and retries are disabled: {}",
                request.method(),
                request.url(),
                error
            );
            return Err(transient(request, &error));
        }

        update_error_stats(self.error_stats, &error);

        let current_timeout = if error.kind().is_network() {
            self.timeouts.increase_timeout_on_error(&host).await
        } else {
            self.timeouts.get_timeout(&host).await
        };

        self.record_failure(request, &host, &error, current_timeout)
            .await
            .map_err(RequestError::ScanMustStop)?;

        debug!(
            "{} {} failed on attempt {}: {}",
            request.method(),
            request.url(),
            attempt + 1,
            error
        );
        Err(transient(request, &error))
    }

    /// Records a failed attempt and checks whether the scan must stop.
    ///
    /// Returns the installed stop error when it must.
    async fn record_failure(
        &self,
        request: &HttpRequest,
        host: &str,
        error: &TransportError,
        current_timeout: Duration,
    ) -> Result<(), Arc<ScanStopError>> {
        let mut window = self.history.lock().await;

        // Another sender may have stopped the scan while we waited for the lock
        if let Some(stop) = self.control.stop_error().await {
            return Err(stop);
        }

        window.record(OutcomeRecord::failure(
            host,
            error.reason_or_message(),
            Some(current_timeout),
        ));

        let probe_timeout = self.timeouts.get_timeout(host).await * PROBE_TIMEOUT_MULT;
        if !should_stop_scan(&mut window, request, self.probe, probe_timeout).await {
            return Ok(());
        }

        let stop = self
            .control
            .install_stop(build_stop_error(error, &window))
            .await;
        error!("The scan must stop: {}", stop);
        Err(stop)
    }
}

fn transient(request: &HttpRequest, error: &TransportError) -> RequestError {
    RequestError::Transient {
        method: request.method().to_string(),
        url: request.url().to_string(),
        reason: error.reason_or_message(),
        kind: error.kind(),
    }
}
