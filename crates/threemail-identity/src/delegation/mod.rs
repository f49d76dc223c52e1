//! Delegations issued by the identity provider.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a delegation stops being used.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Signed credential authorizing requests made on a principal's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    /// Opaque signed delegation, forwarded verbatim to the message store.
    pub token: String,
    /// Session key the delegation was issued to.
    pub session_key: String,
    /// Expiration time.
    pub expires_at: DateTime<Utc>,
}

impl Delegation {
    /// Creates a new delegation.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        session_key: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            session_key: session_key.into(),
            expires_at,
        }
    }

    /// Creates a delegation from the provider's response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an empty delegation or a
    /// zero lifetime.
    pub fn from_response(response: &DelegationResponse, session_key: &str) -> Result<Self> {
        if response.delegation.is_empty() {
            return Err(Error::InvalidResponse("empty delegation".into()));
        }
        if response.expires_in == 0 {
            return Err(Error::InvalidResponse("delegation has no lifetime".into()));
        }

        let lifetime = i64::try_from(response.expires_in)
            .map_err(|_| Error::InvalidResponse("delegation lifetime out of range".into()))?;

        Ok(Self::new(
            response.delegation.clone(),
            session_key,
            Utc::now() + Duration::seconds(lifetime),
        ))
    }

    /// Checks if the delegation is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECS) >= self.expires_at
    }

    /// Returns true if the delegation can still sign requests.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Value of the `Authorization` header for signed requests.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Delegation {}", self.token)
    }
}

/// Delegation response from the identity provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DelegationResponse {
    /// Principal the delegation was issued for, in text form.
    pub principal: String,
    /// Signed delegation.
    pub delegation: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Error response from the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::provider_error(self.error, self.error_description)
    }
}
