//! Error types for identity operations.

use std::io;

use crate::principal::PrincipalError;

/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identity error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the identity provider.
    #[error("Identity provider error: {error} - {description}")]
    Provider {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// Delegation expired.
    #[error("Delegation expired")]
    DelegationExpired,

    /// The callback did not match the login attempt.
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// Invalid delegation response.
    #[error("Invalid delegation response: {0}")]
    InvalidResponse(String),

    /// Login timeout.
    #[error("Login timed out after {0} seconds")]
    Timeout(u64),

    /// User cancelled or denied the login.
    #[error("Login cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    /// Malformed principal text.
    #[error("Invalid principal: {0}")]
    Principal(#[from] PrincipalError),

    /// Session storage failed.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl Error {
    /// Creates a provider error from error code and description.
    #[must_use]
    pub fn provider_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Provider {
            error: error.into(),
            description: description.into(),
        }
    }
}
