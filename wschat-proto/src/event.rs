//! WebSocket event types.
//!
//! The two directions use different envelope shapes, and both are part of
//! the contract:
//!
//! ```text
//! server -> client   {"type": "chat", "data": {"from": "bob", "text": "hi"}}
//! client -> server   {"type": "chat", "text": "hi"}
//!                    {"type": "typing", "isTyping": true}
//! ```

use serde::{Deserialize, Serialize};

/// An event pushed by the chat server.
///
/// Serializes to the nested `{type, data}` envelope. Decoding goes through
/// [`crate::codec::decode_inbound`] so that unknown tags can be told apart
/// from malformed frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Full snapshot of who is online, sent once after connecting.
    OnlineList {
        /// Usernames currently connected (may repeat for multi-session users).
        users: Vec<String>,
    },
    /// A chat line from another connection.
    Chat {
        /// Author's username.
        from: String,
        /// Message body.
        text: String,
    },
    /// A user's first connection came up.
    UserJoined {
        /// The user who joined.
        user: String,
    },
    /// A user's last connection went away.
    UserLeft {
        /// The user who left.
        user: String,
    },
    /// Typing status change from another user.
    Typing {
        /// Who is (or stopped) typing.
        user: String,
        /// `true` at the start of a burst, `false` after it ends.
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    /// The server refused something we sent (e.g. `rate_limited`).
    Error {
        /// Machine-readable reason.
        error: String,
    },
}

impl InboundEvent {
    /// Wire tag of this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OnlineList { .. } => "online_list",
            Self::Chat { .. } => "chat",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::Typing { .. } => "typing",
            Self::Error { .. } => "error",
        }
    }
}

/// An event sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Post a chat line to everyone else.
    Chat {
        /// Message body.
        text: String,
    },
    /// Announce the start or end of a typing burst.
    Typing {
        /// Current typing state.
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}
