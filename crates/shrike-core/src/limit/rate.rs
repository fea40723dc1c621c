use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Slack added to computed waits so the oldest admission has aged out of
/// the window by the time a sleeping caller retries.
const WINDOW_SLACK: Duration = Duration::from_millis(100);

/// Sliding-window rate limiter shared by concurrent fetch tasks.
///
/// At most `max_requests` admissions are recorded within any trailing
/// `time_window`. Callers over the limit are delayed, never rejected.
pub struct RateLimiter {
    time_window: Duration,
    state: Mutex<Window>,
}

struct Window {
    max_requests: usize,
    admitted: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            time_window,
            state: Mutex::new(Window {
                max_requests,
                admitted: VecDeque::new(),
            }),
        }
    }

    /// Wait until one more admission fits in the trailing window, then
    /// record it.
    pub async fn acquire(&self) {
        // Retry loop, not recursion: a sleeping caller can lose the race
        // to another task and go around again any number of times.
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                while state
                    .admitted
                    .front()
                    .is_some_and(|&t| now.duration_since(t) > self.time_window)
                {
                    state.admitted.pop_front();
                }

                if state.admitted.len() < state.max_requests {
                    state.admitted.push_back(now);
                    return;
                }

                let oldest = state.admitted[0];
                self.time_window.saturating_sub(now.duration_since(oldest)) + WINDOW_SLACK
            };

            // The lock is not held while sleeping.
            tracing::trace!(?wait, "rate window full, delaying");
            tokio::time::sleep(wait).await;
        }
    }

    /// Clear all admission history.
    pub async fn reset(&self) {
        self.state.lock().await.admitted.clear();
    }

    /// Admissions per second over the trailing window.
    pub async fn current_rate(&self) -> f64 {
        let state = self.state.lock().await;
        let now = Instant::now();
        let recent = state
            .admitted
            .iter()
            .filter(|&&t| now.duration_since(t) <= self.time_window)
            .count();
        if recent == 0 {
            0.0
        } else {
            recent as f64 / self.time_window.as_secs_f64()
        }
    }

    pub async fn max_requests(&self) -> usize {
        self.state.lock().await.max_requests
    }

    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Replace the window limit with `f(current)` and return the new value.
    pub(super) async fn adjust_max_requests(&self, f: impl FnOnce(usize) -> usize) -> usize {
        let mut state = self.state.lock().await;
        state.max_requests = f(state.max_requests);
        state.max_requests
    }
}
