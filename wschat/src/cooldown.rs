//! Client-side minimum interval between chat sends.
//!
//! Advisory only: the server enforces its own limits.

use std::time::{Duration, Instant};

/// Enforces a minimum gap between transmitted chat messages.
#[derive(Debug, Clone)]
pub struct SendCooldown {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl SendCooldown {
    /// Creates a cooldown that has never fired.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Returns `Err(remaining)` if a send at `now` would fall inside the window.
    ///
    /// # Errors
    ///
    /// The error carries the time left until the window closes.
    pub fn check(&self, now: Instant) -> Result<(), Duration> {
        match self.last_sent {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed < self.interval {
                    Err(self.interval - elapsed)
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Marks a transmitted send, restarting the window.
    pub const fn record(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Forgets the last send, e.g. when it never left the client.
    pub const fn clear(&mut self) {
        self.last_sent = None;
    }

    /// The configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
