//! # threemail-identity
//!
//! Identity sessions for the 3Mail client.
//!
//! ## Features
//!
//! - **Principals**: canonical account identifiers and their checksummed
//!   base32 text form
//! - **Login flow**: browser redirect against the identity provider, with a
//!   session-key challenge and a loopback callback listener
//! - **Delegations**: expiring credentials that sign message-store requests
//! - **Session lifecycle**: restore on start-up, login, idempotent logout,
//!   persisted in the system keyring
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use threemail_identity::{
//!     BrowserAuthenticator, IdentityClient, KeyringSessionStore, Provider, SessionManager,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = IdentityClient::new(Provider::internet_identity()?);
//!     let authenticator = BrowserAuthenticator::new(client, Duration::from_secs(300));
//!     let mut sessions = SessionManager::new(authenticator, KeyringSessionStore::new());
//!
//!     let identity = match sessions.restore_session() {
//!         Some(identity) => identity,
//!         None => sessions.login().await?,
//!     };
//!
//!     println!("Your 3Mail ID - {}", identity.principal());
//!     let channel = identity.channel();
//!     // Hand `channel` to a message store transport.
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod delegation;
mod error;
pub mod flow;
mod identity;
pub mod principal;
pub mod provider;
pub mod session;
pub mod store;

pub use delegation::Delegation;
pub use error::{Error, Result};
pub use flow::{Authenticator, BrowserAuthenticator, Callback, IdentityClient, LoginFlow};
pub use identity::{Identity, RequestChannel};
pub use principal::{Principal, PrincipalError};
pub use provider::Provider;
pub use session::SessionManager;
pub use store::{KeyringSessionStore, MemorySessionStore, SessionStore};
