//! Per-client request throttling.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as Governor};
use nonzero_ext::nonzero;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Admits at most one physical request per interval, with a burst of one.
pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    interval: Duration,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter; `None` when the interval is zero (no limiting)
    pub fn new(interval: Duration) -> Option<Self> {
        let quota = Quota::with_period(interval)?.allow_burst(nonzero!(1u32));
        Some(Self {
            limiter: Governor::direct(quota),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next permit, aborting if `cancel` fires first
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Error> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}
