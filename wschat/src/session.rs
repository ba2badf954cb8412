//! The authenticated session: credential, identity, and connection state.
//!
//! Every connect attempt is stamped with an [`AttemptId`] taken from a
//! monotonically increasing generation counter. Reconnect timers remember
//! the attempt they were scheduled for; when one fires after a newer attempt
//! has started (a manual reconnect, a logout) it is stale and does nothing.

use std::fmt;

/// Lifecycle of the WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection and none pending. Initial state and post-logout.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The WebSocket is open.
    Open,
    /// The connection was lost; a retry is scheduled.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Generation number of a single connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Raw generation number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One logged-in chat client instance.
pub struct Session {
    username: String,
    token: String,
    state: ConnectionState,
    generation: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Session {
    /// Creates a session from a freshly issued token. Starts `Disconnected`.
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            state: ConnectionState::Disconnected,
            generation: 0,
        }
    }

    /// The local user's name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The bearer token. Empty after logout.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the session still holds a credential.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// The most recent attempt, if any has been made.
    #[must_use]
    pub const fn current_attempt(&self) -> Option<AttemptId> {
        if self.generation == 0 {
            None
        } else {
            Some(AttemptId(self.generation))
        }
    }

    /// Whether `attempt` is the latest one.
    #[must_use]
    pub const fn is_current(&self, attempt: AttemptId) -> bool {
        attempt.0 == self.generation
    }

    /// Starts a new connect attempt, superseding every earlier one.
    ///
    /// Returns `None` once the session has been logged out.
    pub fn begin_attempt(&mut self) -> Option<AttemptId> {
        if !self.has_token() {
            return None;
        }
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        Some(AttemptId(self.generation))
    }

    /// The WebSocket for `attempt` opened. Returns `false` if it is stale.
    pub const fn mark_open(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) || !matches!(self.state, ConnectionState::Connecting) {
            return false;
        }
        self.state = ConnectionState::Open;
        true
    }

    /// The connection for `attempt` closed or failed to open.
    ///
    /// Returns `false` if the attempt is stale or the session is already
    /// disconnected.
    pub const fn mark_lost(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) {
            return false;
        }
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Reconnecting;
                true
            }
            ConnectionState::Reconnecting | ConnectionState::Disconnected => false,
        }
    }

    /// A reconnect timer scheduled for `scheduled_for` fired.
    ///
    /// Starts the next attempt if the timer is still relevant. A timer
    /// scheduled for a superseded attempt returns `None` and changes nothing.
    pub fn fire_reconnect(&mut self, scheduled_for: AttemptId) -> Option<AttemptId> {
        if !self.is_current(scheduled_for)
            || !matches!(self.state, ConnectionState::Reconnecting)
        {
            return None;
        }
        self.begin_attempt()
    }

    /// Ends the session: clears the token and invalidates every pending timer.
    pub fn logout(&mut self) {
        self.token.clear();
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
    }
}
