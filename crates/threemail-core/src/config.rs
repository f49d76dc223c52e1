//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use threemail_identity::Provider;
use threemail_store::HttpConnector;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default message store endpoint (local replica).
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:4943/threemail_backend";

/// Default login timeout in seconds.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;

/// Longest delegation requested from the provider (eight hours).
const DELEGATION_TTL_SECS: u64 = 8 * 60 * 60;

/// Settings read from `<config dir>/threemail/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identity provider origin.
    pub identity_provider: String,
    /// Message store base URL.
    pub store_url: String,
    /// Loopback port for the login callback. 0 picks a free port.
    pub callback_port: u16,
    /// How long to wait for the browser login.
    pub login_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            identity_provider: Provider::INTERNET_IDENTITY.to_string(),
            store_url: DEFAULT_STORE_URL.to_string(),
            callback_port: 0,
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("threemail")
            .join("config.json")
    }

    /// Loads the configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Loads the configuration from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration to `path` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.login_timeout_secs == 0 {
            return Err(Error::Config("login_timeout_secs must be positive".into()));
        }
        self.provider()?;
        HttpConnector::new(&self.store_url)
            .map(drop)
            .map_err(|e| Error::Config(format!("store_url: {e}")))
    }

    /// The configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider origin is not a valid URL.
    pub fn provider(&self) -> Result<Provider> {
        let provider = Provider::from_origin("Internet Identity", &self.identity_provider)
            .and_then(|p| {
                let p = p.with_max_time_to_live(DELEGATION_TTL_SECS);
                p.validate().map(|()| p)
            })
            .map_err(|e| Error::Config(format!("identity_provider: {e}")))?;
        Ok(provider)
    }

    /// Login timeout as a [`Duration`].
    #[must_use]
    pub const fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("threemail-config-{}-{name}", std::process::id()))
            .join("config.json")
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.identity_provider, "https://identity.ic0.app");
        assert_eq!(config.callback_port, 0);
        assert_eq!(config.login_timeout(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ClientConfig::load_from(&scratch("missing")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("roundtrip");
        let config = ClientConfig {
            store_url: "https://store.example/api".into(),
            callback_port: 8765,
            ..ClientConfig::default()
        };

        config.save(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"callback_port": 9000}"#).unwrap();
        assert_eq!(config.callback_port, 9000);
        assert_eq!(config.login_timeout_secs, DEFAULT_LOGIN_TIMEOUT_SECS);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ClientConfig {
            login_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_provider_endpoints() {
        let provider = ClientConfig::default().provider().unwrap();
        assert_eq!(provider.auth_url.as_str(), "https://identity.ic0.app/authorize");
        assert_eq!(provider.max_time_to_live, Some(DELEGATION_TTL_SECS));
    }

    #[test]
    fn test_rejects_bad_store_url() {
        let config = ClientConfig {
            store_url: "store.example".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
