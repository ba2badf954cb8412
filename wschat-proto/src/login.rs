//! HTTP login exchange types.
//!
//! `POST /login` takes a [`LoginRequest`] and answers with a
//! [`LoginResponse`] on success. Failures carry a [`LoginErrorBody`] when the
//! server bothers to send one.

use serde::{Deserialize, Serialize};

/// Credentials submitted to the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name.
    pub username: String,
    /// Plaintext password (the transport is expected to be TLS).
    pub password: String,
}

/// Successful login answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Opaque bearer credential, valid for the lifetime of the session.
    pub token: String,
}

/// Error body returned with a non-2xx login status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginErrorBody {
    /// Machine-readable reason, e.g. `invalid_credentials` or `rate_limited`.
    pub error: String,
}
