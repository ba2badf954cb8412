//! Shared protocol definitions for the `wschat` wire format.
//!
//! The chat server speaks JSON: an HTTP login exchange and text-frame
//! envelopes over a WebSocket. This crate owns both halves of that contract.

pub mod codec;
pub mod event;
pub mod login;

pub use codec::ProtoError;
