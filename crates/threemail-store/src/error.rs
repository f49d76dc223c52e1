//! Error types for message store calls.

/// Result type alias for message store calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message store call failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never got a usable answer.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The store answered and refused.
    #[error("{capability} rejected: {reason}")]
    Rejected {
        /// Capability that was called.
        capability: String,
        /// Reason given by the store.
        reason: String,
    },

    /// The store did not accept the request's credentials.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The reply could not be decoded.
    #[error("Malformed reply: {0}")]
    Decode(#[from] serde_json::Error),

    /// The store URL is unusable.
    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Creates a rejection for a capability.
    #[must_use]
    pub fn rejected(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            capability: capability.into(),
            reason: reason.into(),
        }
    }
}
