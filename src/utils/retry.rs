//! Retry classification and exponential backoff with jitter.

use ::http::StatusCode;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::transport::TransportError;

/// Fraction of the capped delay used as the jitter bound
const JITTER_FRACTION: f64 = 0.1;

/// HTTP statuses that indicate a transient server-side condition
const RETRYABLE_STATUSES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of physical attempts (1 = no retry)
    pub max_attempts: u32,
    /// Delay before the second attempt
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,
    /// Upper bound on the delay before jitter
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` and default intervals
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Fill unset (zero) fields with defaults and restore the invariants
    /// `max_attempts >= 1` and `max_interval >= initial_interval`.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_attempts == 0 {
            self.max_attempts = 1;
        }
        if self.initial_interval.is_zero() {
            self.initial_interval = defaults.initial_interval;
        }
        if self.max_interval.is_zero() {
            self.max_interval = defaults.max_interval;
        }
        if self.max_interval < self.initial_interval {
            self.max_interval = self.initial_interval;
        }
        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            self.multiplier = defaults.multiplier;
        }
        self
    }

    /// Deterministic delay before jitter: `min(max, initial * multiplier^(attempt-1))`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self.initial_interval.as_secs_f64()
            * self.multiplier.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        let capped = exp.min(self.max_interval.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }
}

/// Whether a failed attempt should be retried.
///
/// Network timeouts and connection failures are retryable, as are the
/// statuses 408, 429, 500, 502, 503 and 504. Anything else, including the
/// absence of both an error and a response, is not.
pub fn is_retryable(error: Option<&TransportError>, status: Option<u16>) -> bool {
    if error.is_some_and(TransportError::is_network) {
        return true;
    }
    status.is_some_and(|code| RETRYABLE_STATUSES.iter().any(|s| s.as_u16() == code))
}

/// Delay before the attempt following `attempt`, with up to ±10% jitter.
///
/// Zero for `attempt == 0` or when no policy is configured.
pub fn backoff(attempt: u32, policy: Option<&RetryPolicy>) -> Duration {
    let Some(policy) = policy else {
        return Duration::ZERO;
    };
    let base = policy.base_delay(attempt).as_secs_f64();
    if base == 0.0 {
        return Duration::ZERO;
    }

    let factor: f64 = rand::rng().random_range(-1.0..=1.0);
    let jittered = base + JITTER_FRACTION * base * factor;
    Duration::from_secs_f64(jittered.max(0.0))
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
