//! Rolling window of request outcomes.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use super::outcome::OutcomeRecord;
use crate::config::MAX_RESPONSE_COLLECT;

/// Fixed-capacity FIFO of outcome records, newest last.
///
/// Not synchronized; [`OutcomeHistory`] owns one behind a mutex and hands out the
/// guard when a caller needs a consistent view across several operations.
#[derive(Debug)]
pub struct OutcomeWindow {
    records: VecDeque<OutcomeRecord>,
    capacity: usize,
}

impl OutcomeWindow {
    /// Creates an empty window.
    pub fn new(capacity: usize) -> Self {
        OutcomeWindow {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Creates a window filled with synthetic successes.
    pub fn seeded(capacity: usize) -> Self {
        let mut window = Self::new(capacity);
        window.seed();
        window
    }

    /// Appends an outcome, evicting the oldest one on overflow.
    pub fn record(&mut self, outcome: OutcomeRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(outcome);
    }

    /// The newest `n` records (fewer if the window holds fewer), oldest first.
    pub fn last_n(&self, n: usize) -> Vec<OutcomeRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// Percentage (0-100) of failed records over the whole window.
    pub fn error_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }

        let failed = self.records.iter().filter(|r| !r.is_successful()).count();
        100.0 * failed as f64 / self.records.len() as f64
    }

    /// Average RTT of the newest `count` successful samples for `host`.
    ///
    /// Returns the average (if any sample exists) and the number of samples used.
    pub fn average_rtt(&self, host: &str, count: usize) -> (Option<Duration>, usize) {
        let samples: Vec<Duration> = self
            .records
            .iter()
            .rev()
            .filter(|r| r.is_successful() && r.host() == host)
            .filter_map(|r| r.rtt())
            .take(count)
            .collect();

        if samples.is_empty() {
            return (None, 0);
        }

        let total: Duration = samples.iter().sum();
        (Some(total / samples.len() as u32), samples.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record and re-seeds the window.
    pub fn reset(&mut self) {
        self.records.clear();
        self.seed();
    }

    fn seed(&mut self) {
        for _ in 0..self.capacity {
            self.records.push_back(OutcomeRecord::seed());
        }
    }
}

/// Thread-safe outcome history shared by every sender.
///
/// Appends and reads go through a single lock; the stop-pattern check holds the
/// same lock so it never sees a torn window.
pub struct OutcomeHistory {
    window: Mutex<OutcomeWindow>,
}

impl OutcomeHistory {
    /// Creates a history seeded with `MAX_RESPONSE_COLLECT` successes.
    pub fn new() -> Self {
        Self::with_capacity(MAX_RESPONSE_COLLECT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        OutcomeHistory {
            window: Mutex::new(OutcomeWindow::seeded(capacity)),
        }
    }

    /// Builds a history from explicit records (oldest first), without seeding.
    pub fn from_records(capacity: usize, records: impl IntoIterator<Item = OutcomeRecord>) -> Self {
        let mut window = OutcomeWindow::new(capacity);
        for record in records {
            window.record(record);
        }
        OutcomeHistory {
            window: Mutex::new(window),
        }
    }

    /// Locks the window for a multi-step operation.
    pub async fn lock(&self) -> MutexGuard<'_, OutcomeWindow> {
        self.window.lock().await
    }

    pub async fn record(&self, outcome: OutcomeRecord) {
        self.window.lock().await.record(outcome);
    }

    pub async fn last_n(&self, n: usize) -> Vec<OutcomeRecord> {
        self.window.lock().await.last_n(n)
    }

    pub async fn error_rate(&self) -> f64 {
        self.window.lock().await.error_rate()
    }

    pub async fn average_rtt(&self, host: &str, count: usize) -> (Option<Duration>, usize) {
        self.window.lock().await.average_rtt(host, count)
    }

    pub async fn len(&self) -> usize {
        self.window.lock().await.len()
    }

    /// Re-seeds the history for a new scan.
    pub async fn reset(&self) {
        self.window.lock().await.reset();
    }
}

impl Default for OutcomeHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(reason: &str) -> OutcomeRecord {
        OutcomeRecord::failure("example.com", reason, None)
    }

    #[test]
    fn test_window_empty_error_rate() {
        let window = OutcomeWindow::new(100);
        assert_eq!(window.error_rate(), 0.0);
        assert!(window.is_empty());
    }

    #[test]
    fn test_window_seeded_is_full_of_successes() {
        let window = OutcomeWindow::seeded(100);
        assert_eq!(window.len(), 100);
        assert_eq!(window.error_rate(), 0.0);
        assert!(window.last_n(100).iter().all(|r| r.is_successful()));
    }

    #[test]
    fn test_window_error_rate_partial_fill() {
        for n in 1..=100usize {
            for failures in [0, n / 3, n] {
                let mut window = OutcomeWindow::new(100);
                for i in 0..n {
                    if i < failures {
                        window.record(fail("timeout"));
                    } else {
                        window.record(OutcomeRecord::success("example.com", Duration::from_millis(5)));
                    }
                }
                let expected = 100.0 * failures as f64 / n as f64;
                assert!(
                    (window.error_rate() - expected).abs() < 1e-9,
                    "n={} failures={} got {}",
                    n,
                    failures,
                    window.error_rate()
                );
            }
        }
    }

    #[test]
    fn test_window_error_rate_over_full_buffer() {
        let mut window = OutcomeWindow::seeded(100);
        for _ in 0..25 {
            window.record(fail("timeout"));
        }
        assert_eq!(window.len(), 100);
        assert_eq!(window.error_rate(), 25.0);
    }

    #[test]
    fn test_window_fifo_eviction() {
        let mut window = OutcomeWindow::new(3);
        window.record(fail("a"));
        window.record(fail("b"));
        window.record(fail("c"));
        window.record(fail("d"));

        let reasons: Vec<String> = window
            .last_n(10)
            .iter()
            .map(|r| r.reason().to_string())
            .collect();
        assert_eq!(reasons, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_window_last_n_returns_newest_oldest_first() {
        let mut window = OutcomeWindow::new(10);
        for reason in ["a", "b", "c", "d"] {
            window.record(fail(reason));
        }
        let reasons: Vec<String> = window
            .last_n(2)
            .iter()
            .map(|r| r.reason().to_string())
            .collect();
        assert_eq!(reasons, vec!["c", "d"]);
    }

    #[test]
    fn test_window_average_rtt_per_host() {
        let mut window = OutcomeWindow::seeded(100);
        window.record(OutcomeRecord::success("a.com", Duration::from_millis(100)));
        window.record(OutcomeRecord::success("a.com", Duration::from_millis(300)));
        window.record(OutcomeRecord::success("b.com", Duration::from_millis(900)));
        window.record(OutcomeRecord::failure(
            "a.com",
            "timeout",
            Some(Duration::from_secs(6)),
        ));

        let (avg, samples) = window.average_rtt("a.com", 25);
        assert_eq!(samples, 2);
        assert_eq!(avg, Some(Duration::from_millis(200)));

        // Newest samples win when limited
        let (avg, samples) = window.average_rtt("a.com", 1);
        assert_eq!(samples, 1);
        assert_eq!(avg, Some(Duration::from_millis(300)));

        assert_eq!(window.average_rtt("c.com", 25), (None, 0));
    }

    #[test]
    fn test_window_reset_reseeds() {
        let mut window = OutcomeWindow::seeded(10);
        for _ in 0..10 {
            window.record(fail("timeout"));
        }
        assert_eq!(window.error_rate(), 100.0);
        window.reset();
        assert_eq!(window.len(), 10);
        assert_eq!(window.error_rate(), 0.0);
    }

    #[tokio::test]
    async fn test_history_concurrent_records_are_bounded() {
        let history = std::sync::Arc::new(OutcomeHistory::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let history = std::sync::Arc::clone(&history);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    history.record(fail("reset")).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(history.len().await, MAX_RESPONSE_COLLECT);
        assert_eq!(history.error_rate().await, 100.0);
    }

    #[tokio::test]
    async fn test_history_from_records_is_not_seeded() {
        let history = OutcomeHistory::from_records(100, vec![fail("x")]);
        assert_eq!(history.len().await, 1);
        assert_eq!(history.error_rate().await, 100.0);
    }
}
