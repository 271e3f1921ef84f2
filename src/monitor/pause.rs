//! Error-rate driven pauses.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::{ACCEPTABLE_ERROR_RATE, SOCKET_ERROR_DELAY};

/// Remembers which error-rate buckets already triggered a pause.
///
/// Each bucket pauses at most once between two ledger resets, so a steady
/// error rate slows the scan down once instead of on every check.
#[derive(Debug, Default)]
pub struct SleepLedger {
    slept: Mutex<HashMap<u64, bool>>,
}

impl SleepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `bucket` as slept. Returns `true` if it was not marked before.
    pub async fn claim(&self, bucket: u64) -> bool {
        self.update(false, Some(bucket)).await
    }

    /// Optionally forgets every bucket, then optionally claims one.
    ///
    /// Reset, check and mark happen under one lock: a claim never interleaves
    /// with the periodic reset, and two concurrent callers never both claim
    /// the same bucket. Returns `true` when `bucket` was claimed.
    pub async fn update(&self, reset: bool, bucket: Option<u64>) -> bool {
        let mut slept = self.slept.lock().await;
        if reset {
            slept.clear();
        }
        let Some(bucket) = bucket else {
            return false;
        };
        if slept.get(&bucket).copied().unwrap_or(false) {
            return false;
        }
        slept.insert(bucket, true);
        true
    }

    pub async fn clear(&self) {
        self.slept.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.slept.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slept.lock().await.is_empty()
    }
}

/// Quantizes an error rate (percentage) into multiples of
/// `2 * ACCEPTABLE_ERROR_RATE`.
pub fn error_rate_bucket(error_rate: f64) -> u64 {
    let width = 2.0 * ACCEPTABLE_ERROR_RATE;
    ((error_rate / width).floor() * width) as u64
}

/// Pause applied for a given error rate (percentage).
pub fn pause_for_error_rate(error_rate: f64) -> Duration {
    Duration::from_secs_f64((SOCKET_ERROR_DELAY * error_rate).max(0.0))
}
