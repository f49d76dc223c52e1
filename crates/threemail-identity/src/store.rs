//! Persisted identity sessions.
//!
//! The identity survives restarts the way a browser keeps its
//! authentication session: serialized as JSON in the platform's native
//! credential storage.
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use tracing::{debug, warn};

use crate::error::Result;
use crate::identity::Identity;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "threemail";

/// Keyring entry holding the current session.
const SESSION_ENTRY: &str = "session";

/// Storage for the one persisted session.
pub trait SessionStore: Send + Sync {
    /// Loads the persisted identity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Identity>>;

    /// Persists an identity, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, identity: &Identity) -> Result<()>;

    /// Removes the persisted identity. Removing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Session storage in the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    /// Creates a store under the default service name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Creates a store under a custom service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Ok(Entry::new(&self.service, SESSION_ENTRY)?)
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<Identity>> {
        match self.entry()?.get_password() {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!("No persisted session in {}", self.service);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_string(identity)?;
        self.entry()?.set_password(&json)?;
        debug!("Stored session for {}", identity.principal());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                debug!("Deleted persisted session");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No persisted session to delete");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete persisted session: {e}");
                Err(e.into())
            }
        }
    }
}

/// Session storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Identity>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds a session.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            slot: Mutex::new(Some(identity)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Identity>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
