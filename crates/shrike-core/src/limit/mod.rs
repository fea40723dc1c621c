mod adaptive;
mod concurrency;
mod rate;

pub use adaptive::AdaptiveRateLimiter;
pub use concurrency::{ConcurrencyGuard, ConcurrencyLimiter};
pub use rate::RateLimiter;
