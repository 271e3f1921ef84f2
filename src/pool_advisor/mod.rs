//! Worker pool sizing advice.
//!
//! The engine does not own the worker pool; it only tells it to shrink when the
//! target struggles and to grow again once it recovers. Resizes are rate limited
//! by `WORKER_POOL_ADJUST_COOLDOWN`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::info;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::config::{
    ACCEPTABLE_ERROR_RATE, WORKER_POOL_ADJUST_COOLDOWN, WORKER_POOL_GROW_STEP,
    WORKER_POOL_SHRINK_STEP,
};

/// An externally owned pool of workers that can be resized.
pub trait WorkerPool: Send + Sync {
    /// Current number of workers.
    fn size(&self) -> usize;

    /// Requests a new number of workers.
    fn set_size(&self, size: usize);
}

/// A [`WorkerPool`] backed by a semaphore: workers are permits.
///
/// Shrinking forgets idle permits; when every permit is in use the pool shrinks
/// by what it could forget.
pub struct SemaphorePool {
    semaphore: Arc<Semaphore>,
    size: AtomicUsize,
}

impl SemaphorePool {
    pub fn new(semaphore: Arc<Semaphore>, size: usize) -> Self {
        SemaphorePool {
            semaphore,
            size: AtomicUsize::new(size),
        }
    }
}

impl WorkerPool for SemaphorePool {
    fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    fn set_size(&self, size: usize) {
        let current = self.size.load(Ordering::SeqCst);
        if size > current {
            self.semaphore.add_permits(size - current);
            self.size.store(size, Ordering::SeqCst);
        } else if size < current {
            let forgotten = self.semaphore.forget_permits(current - size);
            self.size.store(current - forgotten, Ordering::SeqCst);
        }
    }
}

/// Shrinks or grows a [`WorkerPool`] based on the error rate.
pub struct WorkerPoolAdvisor {
    pool: Arc<dyn WorkerPool>,
    min_workers: usize,
    max_workers: usize,
    last_adjustment: Mutex<Option<Instant>>,
}

impl WorkerPoolAdvisor {
    pub fn new(pool: Arc<dyn WorkerPool>, min_workers: usize, max_workers: usize) -> Self {
        WorkerPoolAdvisor {
            pool,
            min_workers,
            max_workers,
            last_adjustment: Mutex::new(None),
        }
    }

    /// Applies whichever of shrink or grow the error rate calls for.
    ///
    /// Returns the new pool size when the pool was resized.
    pub async fn advise(&self, error_rate: f64) -> Option<usize> {
        if let Some(size) = self.maybe_shrink(error_rate).await {
            return Some(size);
        }
        self.maybe_grow(error_rate).await
    }

    /// Removes `WORKER_POOL_SHRINK_STEP` workers when the error rate reaches
    /// half the acceptable rate. Never goes below `min_workers`.
    pub async fn maybe_shrink(&self, error_rate: f64) -> Option<usize> {
        if error_rate < ACCEPTABLE_ERROR_RATE / 2.0 {
            return None;
        }

        let current = self.pool.size();
        let target = current
            .saturating_sub(WORKER_POOL_SHRINK_STEP)
            .max(self.min_workers);
        if target == current || !self.should_adjust_now().await {
            return None;
        }

        info!(
            "Error rate is {:.1}%, shrinking worker pool from {} to {}",
            error_rate, current, target
        );
        self.pool.set_size(target);
        Some(target)
    }

    /// Adds `WORKER_POOL_GROW_STEP` workers when the error rate is below a
    /// quarter of the acceptable rate. Never goes above `max_workers`.
    pub async fn maybe_grow(&self, error_rate: f64) -> Option<usize> {
        if error_rate >= ACCEPTABLE_ERROR_RATE / 4.0 {
            return None;
        }

        let current = self.pool.size();
        let target = (current + WORKER_POOL_GROW_STEP).min(self.max_workers);
        if target <= current || !self.should_adjust_now().await {
            return None;
        }

        info!(
            "Error rate is {:.1}%, growing worker pool from {} to {}",
            error_rate, current, target
        );
        self.pool.set_size(target);
        Some(target)
    }

    /// True on the first call, then at most once per cooldown period.
    ///
    /// A `true` answer consumes the slot.
    pub async fn should_adjust_now(&self) -> bool {
        let mut last_adjustment = self.last_adjustment.lock().await;
        if let Some(last) = *last_adjustment {
            if last.elapsed() < WORKER_POOL_ADJUST_COOLDOWN {
                return false;
            }
        }
        *last_adjustment = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FakePool {
        size: AtomicUsize,
        resizes: AtomicUsize,
    }

    impl FakePool {
        fn new(size: usize) -> Arc<Self> {
            Arc::new(FakePool {
                size: AtomicUsize::new(size),
                resizes: AtomicUsize::new(0),
            })
        }
    }

    impl WorkerPool for FakePool {
        fn size(&self) -> usize {
            self.size.load(Ordering::SeqCst)
        }

        fn set_size(&self, size: usize) {
            self.resizes.fetch_add(1, Ordering::SeqCst);
            self.size.store(size, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_on_high_error_rate() {
        let pool = FakePool::new(20);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 50);

        assert_eq!(advisor.maybe_shrink(5.0).await, Some(18));
        assert_eq!(pool.size(), 18);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_respects_cooldown() {
        let pool = FakePool::new(20);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 50);

        assert!(advisor.maybe_shrink(50.0).await.is_some());
        assert!(advisor.maybe_shrink(50.0).await.is_none());

        tokio::time::advance(WORKER_POOL_ADJUST_COOLDOWN).await;
        assert_eq!(advisor.maybe_shrink(50.0).await, Some(16));
        assert_eq!(pool.resizes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrink_floors_at_min_workers() {
        let pool = FakePool::new(3);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 50);

        assert_eq!(advisor.maybe_shrink(90.0).await, Some(2));
        tokio::time::advance(WORKER_POOL_ADJUST_COOLDOWN).await;
        assert_eq!(advisor.maybe_shrink(90.0).await, None);
        assert_eq!(pool.size(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grow_on_low_error_rate() {
        let pool = FakePool::new(10);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 11);

        assert_eq!(advisor.maybe_grow(1.0).await, Some(11));
        tokio::time::advance(WORKER_POOL_ADJUST_COOLDOWN).await;
        assert_eq!(advisor.maybe_grow(1.0).await, None);
        assert_eq!(pool.size(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_middle_error_rate_leaves_pool_alone() {
        let pool = FakePool::new(10);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 50);

        // Between a quarter and a half of the acceptable rate
        assert_eq!(advisor.advise(3.0).await, None);
        assert_eq!(pool.resizes.load(Ordering::SeqCst), 0);
        // The cooldown slot was not consumed
        assert!(advisor.should_adjust_now().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advise_picks_direction() {
        let pool = FakePool::new(10);
        let advisor = WorkerPoolAdvisor::new(pool.clone(), 2, 50);

        assert_eq!(advisor.advise(20.0).await, Some(8));
        tokio::time::advance(Duration::from_secs(46)).await;
        assert_eq!(advisor.advise(0.0).await, Some(9));
    }

    #[tokio::test]
    async fn test_semaphore_pool_resizes_permits() {
        let semaphore = Arc::new(Semaphore::new(10));
        let pool = SemaphorePool::new(Arc::clone(&semaphore), 10);

        pool.set_size(7);
        assert_eq!(pool.size(), 7);
        assert_eq!(semaphore.available_permits(), 7);

        pool.set_size(12);
        assert_eq!(pool.size(), 12);
        assert_eq!(semaphore.available_permits(), 12);
    }

    #[tokio::test]
    async fn test_semaphore_pool_shrinks_only_idle_permits() {
        let semaphore = Arc::new(Semaphore::new(4));
        let pool = SemaphorePool::new(Arc::clone(&semaphore), 4);

        let _held = semaphore.clone().acquire_many_owned(3).await.unwrap();
        pool.set_size(1);
        // Only one permit was idle
        assert_eq!(pool.size(), 3);
    }
}
