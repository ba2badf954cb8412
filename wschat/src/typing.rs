//! Typing-indicator debounce.
//!
//! A burst of input produces exactly one "started" signal at its first
//! keystroke and exactly one "stopped" signal once the input has been idle
//! for the configured duration. Time is passed in by the caller so the state
//! machine can be driven from the UI tick.

use std::time::{Duration, Instant};

/// Debounces local input changes into typing start/stop signals.
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    idle: Duration,
    /// When the current burst ends if no more input arrives. `None` = not typing.
    deadline: Option<Instant>,
}

impl TypingDebouncer {
    /// Creates an idle debouncer.
    #[must_use]
    pub const fn new(idle: Duration) -> Self {
        Self {
            idle,
            deadline: None,
        }
    }

    /// Records an input change at `now`.
    ///
    /// Returns `true` if this change starts a burst and `typing:true` must be
    /// announced.
    pub fn on_input(&mut self, now: Instant) -> bool {
        let starting = self.deadline.is_none();
        self.deadline = Some(now + self.idle);
        starting
    }

    /// Advances the idle timer to `now`.
    ///
    /// Returns `true` exactly once per burst, when `typing:false` must be
    /// announced.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a burst is in progress.
    #[must_use]
    pub const fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drops the current burst without signalling (e.g. after a disconnect).
    pub const fn reset(&mut self) {
        self.deadline = None;
    }
}
