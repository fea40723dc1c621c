use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-parallelism gate with a live occupancy counter.
///
/// `acquire` returns a guard; the permit and the counter are released when
/// the guard drops, on every exit path.
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    max_concurrent: usize,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            active: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
        }
    }

    /// Wait for a free slot and occupy it for the guard's lifetime.
    pub async fn acquire(&self) -> ConcurrencyGuard {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("concurrency semaphore is never closed");
        self.active.fetch_add(1, Ordering::SeqCst);
        ConcurrencyGuard {
            _permit: permit,
            active: Arc::clone(&self.active),
        }
    }

    /// Number of guards currently alive.
    pub fn current_concurrency(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

/// Occupied slot in a [`ConcurrencyLimiter`].
pub struct ConcurrencyGuard {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for ConcurrencyGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
