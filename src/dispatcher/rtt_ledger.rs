//! Cumulative RTT per correlation id.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::config::RTT_LEDGER_CAPACITY;

/// Bounded map of debugging id to the total RTT of its requests.
///
/// Plugins reuse a debugging id across a group of related requests; the ledger
/// answers "how long did this group take on the wire". The least recently
/// updated ids are evicted first.
pub struct RttLedger {
    entries: Mutex<LruCache<String, Duration>>,
}

impl RttLedger {
    pub fn new() -> Self {
        Self::with_capacity(RTT_LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        RttLedger {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Adds `rtt` to the total for `debugging_id`.
    pub async fn add(&self, debugging_id: &str, rtt: Duration) -> Duration {
        let mut entries = self.entries.lock().await;
        let total = entries.get(debugging_id).copied().unwrap_or_default() + rtt;
        entries.put(debugging_id.to_string(), total);
        total
    }

    pub async fn get(&self, debugging_id: &str) -> Option<Duration> {
        self.entries.lock().await.peek(debugging_id).copied()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for RttLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rtt_accumulates_per_id() {
        let ledger = RttLedger::new();
        ledger.add("dbg-1", Duration::from_millis(100)).await;
        let total = ledger.add("dbg-1", Duration::from_millis(250)).await;

        assert_eq!(total, Duration::from_millis(350));
        assert_eq!(ledger.get("dbg-1").await, Some(Duration::from_millis(350)));
        assert_eq!(ledger.get("dbg-2").await, None);
    }

    #[tokio::test]
    async fn test_least_recent_id_is_evicted() {
        let ledger = RttLedger::with_capacity(2);
        ledger.add("a", Duration::from_millis(1)).await;
        ledger.add("b", Duration::from_millis(1)).await;
        ledger.add("a", Duration::from_millis(1)).await;
        ledger.add("c", Duration::from_millis(1)).await;

        assert!(ledger.get("a").await.is_some());
        assert!(ledger.get("b").await.is_none());
        assert!(ledger.get("c").await.is_some());
    }
}
