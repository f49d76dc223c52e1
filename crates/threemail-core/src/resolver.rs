//! Recipient resolution.
//!
//! A recipient is typed either as a principal or as an alias. The principal
//! form wins: anything that parses is used as is, without asking the store.
//! Everything else is lower-cased and looked up once as an alias.

use std::fmt;

use threemail_identity::Principal;
use threemail_store::{MessageStore, Result};
use tracing::debug;

use crate::error::{self, Error};

/// How a recipient was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Via {
    /// The input was a principal.
    Direct,
    /// The input was this (normalized) alias.
    Alias(String),
}

/// A resolved recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// The account to deliver to.
    pub principal: Principal,
    /// Where the principal came from.
    pub via: Via,
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.via {
            Via::Direct => write!(f, "{}", self.principal),
            Via::Alias(alias) => write!(f, "{alias} ({})", self.principal),
        }
    }
}

/// Resolves recipient strings against one store session.
#[derive(Debug)]
pub struct AccountResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: MessageStore> AccountResolver<'a, S> {
    /// Creates a resolver over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolves `input` to an account.
    ///
    /// Returns `None` when the input is neither a principal nor a registered
    /// alias. The input is not trimmed.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the alias lookup fails. A failed lookup
    /// is never reported as "not found".
    pub async fn resolve(&self, input: &str) -> Result<Option<Resolved>> {
        if let Ok(principal) = Principal::from_text(input) {
            debug!("Recipient {principal} given directly");
            return Ok(Some(Resolved {
                principal,
                via: Via::Direct,
            }));
        }

        let alias = input.to_lowercase();
        let found = self.store.resolve_custom_address(&alias).await?;
        debug!(%alias, found = found.is_some(), "Alias lookup");

        Ok(found.map(|principal| Resolved {
            principal,
            via: Via::Alias(alias),
        }))
    }
}

/// Normalizes an alias the user wants to claim.
///
/// The candidate is trimmed and lower-cased. It must be non-empty, contain
/// no whitespace, and must not be a principal itself (it would shadow that
/// account in resolution).
///
/// # Errors
///
/// Returns [`Error::InvalidAlias`] describing the problem.
pub fn normalize_alias(candidate: &str) -> error::Result<String> {
    let alias = candidate.trim().to_lowercase();
    if alias.is_empty() {
        return Err(Error::InvalidAlias("alias is empty".into()));
    }
    if alias.chars().any(char::is_whitespace) {
        return Err(Error::InvalidAlias(format!("\"{alias}\" contains whitespace")));
    }
    if Principal::from_text(&alias).is_ok() {
        return Err(Error::InvalidAlias(format!(
            "\"{alias}\" is already a 3Mail address"
        )));
    }
    Ok(alias)
}
