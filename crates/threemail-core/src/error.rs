//! Error types for the core library.

use thiserror::Error;

use crate::state::{Operation, Phase};

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The recipient is neither a principal nor a registered alias.
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// A message store call failed.
    #[error("Store error: {0}")]
    Store(#[from] threemail_store::Error),

    /// Login or session persistence failed.
    #[error("Identity error: {0}")]
    Identity(#[from] threemail_identity::Error),

    /// A request of the same kind is still outstanding.
    #[error("{0} already in progress")]
    Busy(Operation),

    /// The operation needs an authenticated, initialized session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The alias belongs to another account.
    #[error("Alias already taken: {0}")]
    AliasTaken(String),

    /// The alias cannot be claimed as written.
    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    /// The compose form is incomplete.
    #[error("Invalid message: {0}")]
    InvalidCompose(&'static str),

    /// The session cannot move between these phases.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current phase.
        from: Phase,
        /// Requested phase.
        to: Phase,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
