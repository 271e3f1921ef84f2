//! Per-host timeout control.
//!
//! Timeouts start at the configured (or default) value and then follow the
//! target: they are periodically recomputed from the observed RTT so requests
//! that are going to fail anyway fail fast, and they grow after every socket
//! error because a fresh error is evidence that the host got slower.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::config::{
    EngineConfig, ADJUST_LIMIT, MAX_TIMEOUT, MIN_TIMEOUT, TIMEOUT_INCREASE_MULT,
    TIMEOUT_MULT_CONST, TIMEOUT_UPDATE_ELAPSED_MIN,
};
use crate::history::OutcomeHistory;

/// Clamps a timeout into `[MIN_TIMEOUT, MAX_TIMEOUT]`.
pub fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
}

/// Multiplies a timeout, saturating at `MAX_TIMEOUT` before converting back.
fn scale_timeout(timeout: Duration, factor: f64) -> Duration {
    let secs = (timeout.as_secs_f64() * factor).min(MAX_TIMEOUT.as_secs_f64());
    clamp_timeout(Duration::from_secs_f64(secs.max(0.0)))
}

/// Per-host timeout map with RTT based auto-adjustment.
pub struct TimeoutController {
    timeouts: RwLock<HashMap<String, Duration>>,
    default_timeout: Duration,
    pinned: bool,
    /// Global auto-adjust cooldown, shared by every host
    last_adjustment: Mutex<Option<Instant>>,
}

impl TimeoutController {
    pub fn new(config: &EngineConfig) -> Self {
        TimeoutController {
            timeouts: RwLock::new(HashMap::new()),
            default_timeout: clamp_timeout(config.default_timeout()),
            pinned: config.timeout_is_pinned(),
            last_adjustment: Mutex::new(None),
        }
    }

    /// Timeout for `host`, falling back to the global default.
    pub async fn get_timeout(&self, host: &str) -> Duration {
        self.timeouts
            .read()
            .await
            .get(host)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Stores a clamped timeout for `host` and returns the stored value.
    pub async fn set_timeout(&self, host: &str, timeout: Duration) -> Duration {
        let clamped = clamp_timeout(timeout);
        let mut timeouts = self.timeouts.write().await;
        let previous = timeouts.get(host).copied().unwrap_or(self.default_timeout);
        timeouts.insert(host.to_string(), clamped);

        info!(
            "Updated timeout for {} from {:.2}s to {:.2}s",
            host,
            previous.as_secs_f64(),
            clamped.as_secs_f64()
        );
        clamped
    }

    /// Multiplies the host timeout by `TIMEOUT_INCREASE_MULT`.
    ///
    /// Runs on every socket-level failure, without cooldown.
    pub async fn increase_timeout_on_error(&self, host: &str) -> Duration {
        let mut timeouts = self.timeouts.write().await;
        let previous = timeouts.get(host).copied().unwrap_or(self.default_timeout);
        let increased = scale_timeout(previous, TIMEOUT_INCREASE_MULT);
        timeouts.insert(host.to_string(), increased);

        debug!(
            "Increased timeout for {} from {:.2}s to {:.2}s after socket error",
            host,
            previous.as_secs_f64(),
            increased.as_secs_f64()
        );
        increased
    }

    /// Forgets every per-host value.
    pub async fn clear_all(&self) {
        self.timeouts.write().await.clear();
        *self.last_adjustment.lock().await = None;
    }

    /// Recomputes the host timeout from recent RTT samples.
    ///
    /// Only runs when the timeout is not pinned, every `ADJUST_LIMIT` requests,
    /// and at most once per `TIMEOUT_UPDATE_ELAPSED_MIN`. Returns the new timeout
    /// when one was set.
    pub async fn auto_adjust(
        &self,
        host: &str,
        total_requests: usize,
        history: &OutcomeHistory,
    ) -> Option<Duration> {
        if !self.should_auto_adjust_now(total_requests).await {
            return None;
        }

        let (average_rtt, samples) = history.average_rtt(host, ADJUST_LIMIT).await;

        match average_rtt {
            Some(average_rtt) if samples * 2 >= ADJUST_LIMIT => {
                let timeout = scale_timeout(average_rtt, TIMEOUT_MULT_CONST);
                Some(self.set_timeout(host, timeout).await)
            }
            _ => {
                debug!(
                    "Not enough samples collected ({}) to adjust timeout for {}. Keeping the current value of {:.2}s",
                    samples,
                    host,
                    self.get_timeout(host).await.as_secs_f64()
                );
                None
            }
        }
    }

    async fn should_auto_adjust_now(&self, total_requests: usize) -> bool {
        if self.pinned {
            // The user disabled the timeout auto-adjust feature
            return false;
        }

        if total_requests == 0 || total_requests % ADJUST_LIMIT != 0 {
            return false;
        }

        let mut last_adjustment = self.last_adjustment.lock().await;
        if let Some(last) = *last_adjustment {
            if last.elapsed() < TIMEOUT_UPDATE_ELAPSED_MIN {
                return false;
            }
        }
        *last_adjustment = Some(Instant::now());
        true
    }
}
