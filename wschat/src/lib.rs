//! `wschat`: terminal chat client library.
//!
//! The session manager (`auth`, `session`, `net` and its timing helpers)
//! owns the credential and the WebSocket; the view layer (`app`, `presence`,
//! `ui`) renders what the session reports.

pub mod app;
pub mod auth;
pub mod backoff;
pub mod config;
pub mod cooldown;
pub mod net;
pub mod presence;
pub mod session;
pub mod typing;
pub mod ui;
