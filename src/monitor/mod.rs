//! Error-rate monitoring.
//!
//! Two reactions to a degrading target:
//! - Pausing before sends while the error rate is above `ACCEPTABLE_ERROR_RATE`,
//!   once per error-rate bucket
//! - Stopping the scan after a run of consecutive failures confirmed by a
//!   reachability probe

mod pause;
mod stop;

use std::time::Duration;

use log::{debug, warn};

use crate::config::{ACCEPTABLE_ERROR_RATE, ERROR_DELAY_LIMIT, SLEEP_LEDGER_RESET};
use crate::history::OutcomeHistory;

pub use pause::{error_rate_bucket, pause_for_error_rate, SleepLedger};
pub use stop::{build_stop_error, is_stop_pattern, should_stop_scan};

/// Watches the outcome history and slows senders down when it turns bad.
#[derive(Debug, Default)]
pub struct ErrorRateMonitor {
    ledger: SleepLedger,
}

impl ErrorRateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps the calling task when the error rate is too high.
    ///
    /// `total_requests` is the sequence number of the send, unique per call.
    /// The ledger is reset every `SLEEP_LEDGER_RESET` requests and the error
    /// rate checked every `ERROR_DELAY_LIMIT` requests. Returns the pause that
    /// was applied, if any. Only the calling task is suspended.
    pub async fn should_pause_before_send(
        &self,
        total_requests: usize,
        history: &OutcomeHistory,
    ) -> Option<Duration> {
        let reset = total_requests % SLEEP_LEDGER_RESET == 0;

        let mut error_rate = 0.0;
        let mut bucket = None;
        if total_requests % ERROR_DELAY_LIMIT == 0 {
            error_rate = history.error_rate().await;
            if error_rate > ACCEPTABLE_ERROR_RATE {
                bucket = Some(error_rate_bucket(error_rate));
            }
        }

        if !reset && bucket.is_none() {
            return None;
        }

        if !self.ledger.update(reset, bucket).await {
            if let Some(bucket) = bucket {
                debug!(
                    "Error rate {:.1}% already paused for bucket {}",
                    error_rate, bucket
                );
            }
            return None;
        }

        let pause = pause_for_error_rate(error_rate);
        warn!(
            "Error rate is {:.1}%, pausing for {:.2}s before sending",
            error_rate,
            pause.as_secs_f64()
        );
        tokio::time::sleep(pause).await;
        Some(pause)
    }

    /// Forgets every paused bucket.
    pub async fn reset(&self) {
        self.ledger.clear().await;
    }
}
