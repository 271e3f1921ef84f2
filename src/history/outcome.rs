//! Outcome records.

use std::time::Duration;

use crate::config::SUCCESS_REASON;

/// The outcome of one network attempt.
///
/// Created by the retry policy after each attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    successful: bool,
    reason: String,
    rtt: Option<Duration>,
    host: String,
}

impl OutcomeRecord {
    pub fn success(host: impl Into<String>, rtt: Duration) -> Self {
        OutcomeRecord {
            successful: true,
            reason: SUCCESS_REASON.to_string(),
            rtt: Some(rtt),
            host: host.into(),
        }
    }

    /// A failed attempt. `rtt` is a stand-in for the unknown real latency,
    /// usually the timeout that was in force.
    pub fn failure(host: impl Into<String>, reason: impl Into<String>, rtt: Option<Duration>) -> Self {
        OutcomeRecord {
            successful: false,
            reason: reason.into(),
            rtt,
            host: host.into(),
        }
    }

    /// A success without a usable latency sample, e.g. a reachability probe.
    /// Carries no RTT so it never influences timeout averages.
    pub fn unmeasured_success(host: impl Into<String>) -> Self {
        OutcomeRecord {
            successful: true,
            reason: SUCCESS_REASON.to_string(),
            rtt: None,
            host: host.into(),
        }
    }

    /// Synthetic success used to seed a fresh history.
    pub(crate) fn seed() -> Self {
        Self::unmeasured_success(String::new())
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}
