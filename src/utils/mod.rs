//! Resilience utilities used by the search pipeline.
//!
//! - [`RetryPolicy`]: configuration for exponential backoff
//! - [`is_retryable`]: classify a failed attempt
//! - [`backoff`]: jittered delay before the next attempt
//! - [`RateLimiter`]: per-client throttle on the start of each physical request
//!
//! # Retry with Backoff
//!
//! ```rust
//! use arxiv_search::utils::{backoff, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3).initial_interval(Duration::from_millis(500));
//! let delay = backoff(1, Some(&policy));
//! assert!(delay >= Duration::from_millis(450) && delay <= Duration::from_millis(550));
//! ```

mod rate_limit;
mod retry;

pub use rate_limit::RateLimiter;
pub use retry::{backoff, is_retryable, RetryPolicy};
