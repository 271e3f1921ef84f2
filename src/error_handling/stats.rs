//! Failure statistics tracking.
//!
//! Thread-safe counters of transport failures per kind, used for end of scan
//! reporting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::TransportErrorKind;

/// Thread-safe transport failure counters.
///
/// Every [`TransportErrorKind`] is initialized to zero on creation, so the map is
/// never modified after construction and can be shared across tasks with `Arc`.
pub struct ErrorStats {
    failures: HashMap<TransportErrorKind, AtomicUsize>,
}

impl ErrorStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for kind in TransportErrorKind::iter() {
            failures.insert(kind, AtomicUsize::new(0));
        }
        ErrorStats { failures }
    }

    /// Increment the counter for a failure kind.
    pub fn increment(&self, kind: TransportErrorKind) {
        if let Some(counter) = self.failures.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map",
                kind
            );
        }
    }

    /// Get the count for a failure kind.
    pub fn get(&self, kind: TransportErrorKind) -> usize {
        self.failures
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total failures across all kinds.
    pub fn total(&self) -> usize {
        TransportErrorKind::iter().map(|k| self.get(k)).sum()
    }

    /// Non-zero counters, most frequent first.
    pub fn non_zero(&self) -> Vec<(TransportErrorKind, usize)> {
        let mut counts: Vec<_> = TransportErrorKind::iter()
            .map(|k| (k, self.get(k)))
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Reset every counter to zero.
    pub fn reset(&self) {
        for counter in self.failures.values() {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl Default for ErrorStats {
    fn default() -> Self {
        Self::new()
    }
}
