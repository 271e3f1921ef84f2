//! Configuration constants.
//!
//! This module defines the tuning constants of the request engine: history sizes,
//! timeout bounds, error-rate thresholds and cooldowns.

use std::time::Duration;

// Outcome history
/// Number of request outcomes kept in the rolling history.
/// The history is pre-seeded with this many successful outcomes at scan start.
pub const MAX_RESPONSE_COLLECT: usize = 100;
/// Size of the window inspected by the stop-pattern detection.
/// The pattern is one success followed by `MAX_ERROR_COUNT - 1` failures.
pub const MAX_ERROR_COUNT: usize = 11;
/// Reason stored on successful outcome records.
pub const SUCCESS_REASON: &str = "OK";

// Timeouts
/// Timeout used for hosts without an adjusted value when the user did not pin one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);
/// Lower bound for any stored per-host timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
/// Upper bound for any stored per-host timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);
/// Auto-adjusted timeout is `average_rtt * TIMEOUT_MULT_CONST`.
/// With an average RTT of 0.3s this yields a socket timeout of 1.95s.
pub const TIMEOUT_MULT_CONST: f64 = 6.5;
/// Factor applied to a host timeout after each socket-level failure.
pub const TIMEOUT_INCREASE_MULT: f64 = 1.5;
/// Auto-adjust runs once every `ADJUST_LIMIT` requests and samples up to this many RTTs.
pub const ADJUST_LIMIT: usize = 25;
/// Minimum time between two timeout auto-adjustments (shared across hosts).
pub const TIMEOUT_UPDATE_ELAPSED_MIN: Duration = Duration::from_secs(10);
/// The reachability probe gets this multiple of the host timeout.
pub const PROBE_TIMEOUT_MULT: u32 = 4;

// Error rate handling
/// Error rate (percentage) above which requests start being delayed.
pub const ACCEPTABLE_ERROR_RATE: f64 = 10.0;
/// The pause-before-send check only runs every `ERROR_DELAY_LIMIT` requests.
pub const ERROR_DELAY_LIMIT: usize = 8;
/// Delay per error-rate percentage point, in seconds.
/// An error rate of 40% yields a 6 second pause.
pub const SOCKET_ERROR_DELAY: f64 = 0.15;
/// The sleep ledger is cleared every this many requests.
pub const SLEEP_LEDGER_RESET: usize = 100;

// Worker pool advice
/// Minimum time between two worker pool resizes.
pub const WORKER_POOL_ADJUST_COOLDOWN: Duration = Duration::from_secs(45);
/// Workers removed per shrink.
pub const WORKER_POOL_SHRINK_STEP: usize = 2;
/// Workers added per grow.
pub const WORKER_POOL_GROW_STEP: usize = 1;

// Retries
/// Number of re-sends after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

// Correlation ids
/// Number of correlation ids tracked by the RTT ledger.
pub const RTT_LEDGER_CAPACITY: usize = 128;

/// Default User-Agent string for HTTP requests.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// CLI
/// Default number of concurrent workers used by the command line scanner.
pub const DEFAULT_WORKERS: usize = 20;
/// Smallest worker pool the advisor will shrink to.
pub const DEFAULT_MIN_WORKERS: usize = 2;
/// Largest worker pool the advisor will grow to.
pub const DEFAULT_MAX_WORKERS: usize = 50;
