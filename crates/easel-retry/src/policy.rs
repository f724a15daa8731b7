//! Backoff policy
//!
//! Delay math lives here as a pure function of the attempt number so the
//! runner stays a thin loop around it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the random jitter, as a fraction of the computed delay.
pub const JITTER_FRACTION: f64 = 0.1;

// Exponent cap; delays this large are clamped by max_delay anyway.
const MAX_EXPONENT: u32 = 30;

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Ceiling applied after backoff and jitter
    pub max_delay: Duration,
    /// Double the delay on every further failure
    pub exponential_backoff: bool,
    /// Add up to [`JITTER_FRACTION`] of random extra delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            exponential_backoff: true,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Default policy.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a total attempt budget (clamped to at least 1).
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// With a base delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// With a delay ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// With exponential backoff switched on or off.
    #[inline]
    #[must_use]
    pub fn with_exponential_backoff(mut self, exponential_backoff: bool) -> Self {
        self.exponential_backoff = exponential_backoff;
        self
    }

    /// With jitter switched on or off.
    #[inline]
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    ///
    /// `base * 2^(attempt-1)` under exponential backoff, plus up to
    /// [`JITTER_FRACTION`] of random extra, clamped to `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let mut delay = if self.exponential_backoff {
            self.base_delay.saturating_mul(1u32 << exponent)
        } else {
            self.base_delay
        };
        if self.jitter {
            delay = delay.saturating_add(delay.mul_f64(rand::random::<f64>() * JITTER_FRACTION));
        }
        delay.min(self.max_delay)
    }
}
