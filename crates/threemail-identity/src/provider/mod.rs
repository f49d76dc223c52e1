//! Identity provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Identity provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Internet Identity").
    pub name: String,
    /// Authorization endpoint the browser is sent to.
    pub auth_url: Url,
    /// Endpoint that exchanges an authorization code for a delegation.
    pub delegation_url: Url,
    /// Maximum delegation lifetime requested, in seconds.
    pub max_time_to_live: Option<u64>,
}

impl Provider {
    /// Default identity provider origin.
    pub const INTERNET_IDENTITY: &'static str = "https://identity.ic0.app";

    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        delegation_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            delegation_url: Url::parse(delegation_url.as_ref())?,
            max_time_to_live: None,
        })
    }

    /// Creates a provider rooted at `origin`, with the standard
    /// `/authorize` and `/delegation` endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not a valid base URL.
    pub fn from_origin(name: impl Into<String>, origin: impl AsRef<str>) -> Result<Self> {
        let base = Url::parse(origin.as_ref())?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "{} cannot be used as a provider origin",
                origin.as_ref()
            )));
        }

        Ok(Self {
            name: name.into(),
            auth_url: base.join("authorize")?,
            delegation_url: base.join("delegation")?,
            max_time_to_live: None,
        })
    }

    /// Sets the maximum delegation lifetime requested.
    #[must_use]
    pub const fn with_max_time_to_live(mut self, seconds: u64) -> Self {
        self.max_time_to_live = Some(seconds);
        self
    }

    /// Internet Identity, the fixed provider the client logs in against.
    ///
    /// Delegations are requested for at most eight hours.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn internet_identity() -> Result<Self> {
        Ok(Self::from_origin("Internet Identity", Self::INTERNET_IDENTITY)?
            .with_max_time_to_live(8 * 60 * 60))
    }

    /// Validates that required URLs are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        for url in [&self.auth_url, &self.delegation_url] {
            if !matches!(url.scheme(), "https" | "http") {
                return Err(Error::InvalidConfig(format!(
                    "{url} must use http or https"
                )));
            }
        }
        if self.max_time_to_live == Some(0) {
            return Err(Error::InvalidConfig("max_time_to_live is zero".into()));
        }
        Ok(())
    }
}
