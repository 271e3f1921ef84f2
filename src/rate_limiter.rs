//! Outbound request rate limiting.
//!
//! Spaces requests at least `1 / max_requests_per_second` apart across every
//! caller. A rate of 0 disables limiting.

use std::time::Duration;

use log::trace;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval rate limiter shared by every sender.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_call_time: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests_per_second: u32) -> Self {
        let min_interval = (max_requests_per_second > 0)
            .then(|| Duration::from_secs_f64(1.0 / f64::from(max_requests_per_second)));

        RateLimiter {
            min_interval,
            last_call_time: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.min_interval.is_some()
    }

    /// Waits until the next request may be sent.
    ///
    /// The lock is held across the sleep; concurrent callers queue up behind
    /// each other.
    pub async fn throttle(&self) {
        let Some(min_interval) = self.min_interval else {
            return;
        };

        let mut last_call_time = self.last_call_time.lock().await;
        if let Some(last) = *last_call_time {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                trace!("Rate limiting, sleeping {:.3}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }
        *last_call_time = Some(Instant::now());
    }
}
