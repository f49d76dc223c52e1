//! Identity session lifecycle: restore, login, logout.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::flow::Authenticator;
use crate::identity::Identity;
use crate::store::SessionStore;

/// Owns the authenticated identity for the lifetime of one session.
#[derive(Debug)]
pub struct SessionManager<A, S> {
    authenticator: A,
    store: S,
    current: Option<Arc<Identity>>,
}

impl<A, S> SessionManager<A, S>
where
    A: Authenticator,
    S: SessionStore,
{
    /// Creates an unauthenticated manager.
    #[must_use]
    pub const fn new(authenticator: A, store: S) -> Self {
        Self {
            authenticator,
            store,
            current: None,
        }
    }

    /// The current identity, if authenticated.
    #[must_use]
    pub const fn current(&self) -> Option<&Arc<Identity>> {
        self.current.as_ref()
    }

    /// Returns true while an identity is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Picks up a persisted session on start-up.
    ///
    /// Expired sessions are discarded. Storage failures are logged and treated
    /// as "no session".
    pub fn restore_session(&mut self) -> Option<Arc<Identity>> {
        if let Some(current) = &self.current {
            return Some(Arc::clone(current));
        }

        let identity = match self.store.load() {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                debug!("No session to restore");
                return None;
            }
            Err(e) => {
                warn!("Could not read persisted session: {e}");
                return None;
            }
        };

        if identity.is_expired() {
            info!("Persisted session for {} has expired", identity.principal());
            if let Err(e) = self.store.clear() {
                warn!("Could not remove expired session: {e}");
            }
            return None;
        }

        info!("Restored session for {}", identity.principal());
        let identity = Arc::new(identity);
        self.current = Some(Arc::clone(&identity));
        Some(identity)
    }

    /// Runs the interactive login.
    ///
    /// On success the identity is held and persisted (a persistence failure
    /// is only logged). On failure nothing changes.
    ///
    /// # Errors
    ///
    /// Returns the authenticator's error when the login fails or is
    /// cancelled.
    pub async fn login(&mut self) -> Result<Arc<Identity>> {
        let identity = match self.authenticator.login().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Login failed: {e}");
                return Err(e);
            }
        };

        if let Err(e) = self.store.save(&identity) {
            warn!("Could not persist session: {e}");
        }

        info!("Logged in as {}", identity.principal());
        let identity = Arc::new(identity);
        self.current = Some(Arc::clone(&identity));
        Ok(identity)
    }

    /// Ends the session. Returns false when there was none.
    ///
    /// The in-memory identity is dropped even if the persisted copy cannot
    /// be removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted session could not be removed.
    pub fn logout(&mut self) -> Result<bool> {
        let Some(identity) = self.current.take() else {
            debug!("Logout without a session");
            return Ok(false);
        };

        info!("Logging out {}", identity.principal());
        self.store.clear()?;
        Ok(true)
    }
}
