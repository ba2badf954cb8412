//! Exponential reconnect backoff with a ceiling.
//!
//! The N-th consecutive failure waits `min(floor * 2^(N-1), ceiling)`. A
//! successful open resets the counter, so the next failure waits `floor`
//! again. There is no attempt limit.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Tracks consecutive connection failures and computes retry delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectConfig,
    failures: u32,
}

impl Backoff {
    /// Creates a backoff with no recorded failures.
    #[must_use]
    pub const fn new(policy: ReconnectConfig) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Records a failure and returns how long to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.delay_for(self.failures)
    }

    /// Delay for the `n`-th consecutive failure (1-based).
    #[must_use]
    pub fn delay_for(&self, n: u32) -> Duration {
        let exponent = n.saturating_sub(1).min(31);
        self.policy
            .floor
            .checked_mul(1u32 << exponent)
            .map_or(self.policy.ceiling, |d| d.min(self.policy.ceiling))
    }

    /// Forgets all failures. Called on every successful open.
    pub const fn reset(&mut self) {
        self.failures = 0;
    }

    /// Number of consecutive failures since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}
