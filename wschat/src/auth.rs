//! Credential acquisition over `POST /login`.

use std::time::Duration;

use url::Url;
use wschat_proto::login::{LoginErrorBody, LoginRequest, LoginResponse};

use crate::session::Session;

/// Errors from the login exchange.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Username or password was empty after trimming. No request was made.
    #[error("username and password are required")]
    MissingCredentials,

    /// The login endpoint could not be derived from the server URL.
    #[error("invalid login url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport failure, timeout, or an undecodable success body.
    #[error("login request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("login rejected ({status}): {reason}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Reason from the error body, or `unknown`.
        reason: String,
    },

    /// The server answered 2xx but handed out an empty token.
    #[error("server returned an empty token")]
    EmptyToken,
}

impl AuthError {
    /// Short text suitable for the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredentials => "Enter a username and password".to_string(),
            Self::Rejected { reason, .. } if reason == "invalid_credentials" => {
                "Invalid username or password".to_string()
            }
            Self::Rejected { reason, .. } if reason == "rate_limited" => {
                "Too many login attempts, try again later".to_string()
            }
            Self::Rejected { status, .. } => format!("Login failed (HTTP {status})"),
            Self::Http(e) if e.is_timeout() => "Login timed out".to_string(),
            Self::Http(e) if e.is_connect() => "Could not reach the server".to_string(),
            other => other.to_string(),
        }
    }
}

/// HTTP client for the login endpoint.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    login_url: Url,
}

impl AuthClient {
    /// Creates a client for the server at `base`.
    ///
    /// # Errors
    ///
    /// Fails if `login` cannot be joined onto `base` or the HTTP client
    /// cannot be built (e.g. no TLS backend).
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, AuthError> {
        let login_url = base.join("login")?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, login_url })
    }

    /// The resolved login endpoint.
    #[must_use]
    pub const fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Exchanges credentials for a token and returns a fresh [`Session`].
    ///
    /// Both fields are trimmed. There is no retry: the caller shows the error
    /// and waits for the user to resubmit.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingCredentials`] before any request if a field is
    /// empty, [`AuthError::Rejected`] on a non-2xx answer, and
    /// [`AuthError::Http`] for transport failures.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(self.login_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp
                .json::<LoginErrorBody>()
                .await
                .map_or_else(|_| "unknown".to_string(), |body| body.error);
            tracing::warn!(status = status.as_u16(), reason = %reason, username, "login rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let body: LoginResponse = resp.json().await?;
        if body.token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        tracing::info!(username, "login succeeded");
        Ok(Session::new(username, body.token))
    }
}
