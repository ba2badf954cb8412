//! JSON encode/decode for WebSocket text frames.
//!
//! Inbound decoding is two-step: the envelope is parsed first, then the
//! `data` object is parsed according to the tag. An unrecognised tag is not
//! an error; [`decode_inbound`] returns `Ok(None)` so callers can ignore it.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::event::{InboundEvent, OutboundEvent};

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The frame is not a JSON object with a string `type` field.
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The tag is known but its `data` does not match the expected shape.
    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        /// Wire tag of the offending frame.
        kind: String,
        /// Underlying parse failure.
        source: serde_json::Error,
    },
    /// Serialization failed.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct UsersData {
    users: Vec<String>,
}

#[derive(Deserialize)]
struct ChatData {
    from: String,
    text: String,
}

#[derive(Deserialize)]
struct UserData {
    user: String,
}

#[derive(Deserialize)]
struct TypingData {
    user: String,
    #[serde(rename = "isTyping", default)]
    is_typing: bool,
}

#[derive(Deserialize)]
struct ErrorData {
    error: String,
}

fn payload<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, ProtoError> {
    serde_json::from_value(data).map_err(|source| ProtoError::Payload {
        kind: kind.to_string(),
        source,
    })
}

/// Decodes a server frame.
///
/// Returns `Ok(None)` for well-formed envelopes whose tag this client does
/// not know.
///
/// # Errors
///
/// Returns [`ProtoError::Envelope`] if the text is not a JSON envelope, or
/// [`ProtoError::Payload`] if a known tag carries a bad `data` object.
pub fn decode_inbound(text: &str) -> Result<Option<InboundEvent>, ProtoError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(ProtoError::Envelope)?;
    let kind = raw.kind.as_str();

    let event = match kind {
        "online_list" => {
            let UsersData { users } = payload(kind, raw.data)?;
            InboundEvent::OnlineList { users }
        }
        "chat" => {
            let ChatData { from, text } = payload(kind, raw.data)?;
            InboundEvent::Chat { from, text }
        }
        "user_joined" => {
            let UserData { user } = payload(kind, raw.data)?;
            InboundEvent::UserJoined { user }
        }
        "user_left" => {
            let UserData { user } = payload(kind, raw.data)?;
            InboundEvent::UserLeft { user }
        }
        "typing" => {
            let TypingData { user, is_typing } = payload(kind, raw.data)?;
            InboundEvent::Typing { user, is_typing }
        }
        "error" => {
            let ErrorData { error } = payload(kind, raw.data)?;
            InboundEvent::Error { error }
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

/// Encodes a server frame. Used by test servers and tooling.
///
/// # Errors
///
/// Returns [`ProtoError::Encode`] if serialization fails.
pub fn encode_inbound(event: &InboundEvent) -> Result<String, ProtoError> {
    serde_json::to_string(event).map_err(ProtoError::Encode)
}

/// Encodes a client frame.
///
/// # Errors
///
/// Returns [`ProtoError::Encode`] if serialization fails.
pub fn encode_outbound(event: &OutboundEvent) -> Result<String, ProtoError> {
    serde_json::to_string(event).map_err(ProtoError::Encode)
}

/// Decodes a client frame. Used by test servers and tooling.
///
/// # Errors
///
/// Returns [`ProtoError::Envelope`] if the text is not a valid client frame.
pub fn decode_outbound(text: &str) -> Result<OutboundEvent, ProtoError> {
    serde_json::from_str(text).map_err(ProtoError::Envelope)
}
