use std::time::Duration;
use tokio::sync::Mutex;

use super::rate::RateLimiter;

/// Consecutive successes required before the window limit is raised by one.
const RAISE_AFTER_SUCCESSES: u32 = 10;

/// Consecutive errors required before the window limit is halved.
const HALVE_AFTER_ERRORS: u32 = 3;

/// Rate limiter that retunes its window limit from fetch outcomes.
///
/// Additive increase, multiplicative decrease: sustained success raises the
/// limit one step at a time, repeated failure halves it. The limit stays
/// within `[initial_rate/4 (rounded up), initial_rate*2]`.
pub struct AdaptiveRateLimiter {
    limiter: RateLimiter,
    initial_rate: usize,
    min_rate: usize,
    max_rate: usize,
    streaks: Mutex<Streaks>,
}

#[derive(Default)]
struct Streaks {
    successes: u32,
    errors: u32,
}

impl AdaptiveRateLimiter {
    pub fn new(initial_rate: usize, time_window: Duration) -> Self {
        Self {
            limiter: RateLimiter::new(initial_rate, time_window),
            initial_rate,
            min_rate: initial_rate.div_ceil(4).max(1),
            max_rate: initial_rate * 2,
            streaks: Mutex::new(Streaks::default()),
        }
    }

    /// Wait for a window slot; see [`RateLimiter::acquire`].
    pub async fn acquire(&self) {
        self.limiter.acquire().await;
    }

    pub async fn reset(&self) {
        self.limiter.reset().await;
    }

    pub async fn current_rate(&self) -> f64 {
        self.limiter.current_rate().await
    }

    pub async fn max_requests(&self) -> usize {
        self.limiter.max_requests().await
    }

    pub fn min_rate(&self) -> usize {
        self.min_rate
    }

    pub fn max_rate(&self) -> usize {
        self.max_rate
    }

    /// Count one successful request toward raising the limit.
    pub async fn record_success(&self) {
        let mut streaks = self.streaks.lock().await;
        streaks.errors = 0;
        streaks.successes += 1;
        if streaks.successes >= RAISE_AFTER_SUCCESSES {
            streaks.successes = 0;
            let max_rate = self.max_rate;
            let limit = self
                .limiter
                .adjust_max_requests(|m| (m + 1).min(max_rate))
                .await;
            tracing::debug!(limit, "raised request rate after sustained success");
        }
    }

    /// Count one failed request toward backing off.
    pub async fn record_error(&self) {
        let mut streaks = self.streaks.lock().await;
        streaks.successes = 0;
        streaks.errors += 1;
        if streaks.errors >= HALVE_AFTER_ERRORS {
            streaks.errors = 0;
            let min_rate = self.min_rate;
            let limit = self
                .limiter
                .adjust_max_requests(|m| (m / 2).max(min_rate))
                .await;
            tracing::warn!(limit, "halved request rate after repeated errors");
        }
    }

    /// Restore the configured rate and clear streaks and history.
    pub async fn reset_to_initial(&self) {
        let mut streaks = self.streaks.lock().await;
        streaks.successes = 0;
        streaks.errors = 0;
        let initial = self.initial_rate;
        self.limiter.adjust_max_requests(|_| initial).await;
        self.limiter.reset().await;
    }
}
