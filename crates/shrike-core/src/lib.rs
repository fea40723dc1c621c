// Admission control: rate and concurrency gates shared by fetch tasks

pub mod limit;

pub use limit::{AdaptiveRateLimiter, ConcurrencyGuard, ConcurrencyLimiter, RateLimiter};
