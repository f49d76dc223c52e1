//! Mail session facade.
//!
//! One method per message store capability, each exactly one round trip.
//! Nothing is cached and nothing is refreshed here; the coordinator decides
//! what to re-fetch after a mutation.

use threemail_identity::Principal;
use threemail_store::{AliasRecord, Message, MessageStore, Result};
use tracing::debug;

use crate::resolver::AccountResolver;

/// Typed access to the message store for one authenticated session.
#[derive(Debug)]
pub struct MailSession<S> {
    store: S,
}

impl<S: MessageStore> MailSession<S> {
    /// Wraps a store bound to the session's identity.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The session's own account.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        self.store.caller()
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// A resolver sharing this session's store.
    #[must_use]
    pub const fn resolver(&self) -> AccountResolver<'_, S> {
        AccountResolver::new(&self.store)
    }

    /// Sends a message to an already resolved recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn send(&self, recipient: &Principal, subject: &str, body: &str) -> Result<String> {
        debug!(%recipient, "Submitting message");
        self.store.submit_message(recipient, subject, body).await
    }

    /// Messages received by this account.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn list_mine(&self) -> Result<Vec<Message>> {
        let messages = self.store.get_my_messages().await?;
        debug!(count = messages.len(), "Fetched received messages");
        Ok(messages)
    }

    /// Received messages not yet viewed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn list_unviewed(&self) -> Result<Vec<Message>> {
        let messages = self.store.get_unviewed_messages().await?;
        debug!(count = messages.len(), "Fetched unviewed messages");
        Ok(messages)
    }

    /// Messages sent by this account.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn list_sent(&self) -> Result<Vec<Message>> {
        let messages = self.store.get_sent_messages().await?;
        debug!(count = messages.len(), "Fetched sent messages");
        Ok(messages)
    }

    /// Received messages whose subject matches `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn search_by_subject(&self, query: &str) -> Result<Vec<Message>> {
        let messages = self.store.search_by_subject(query).await?;
        debug!(count = messages.len(), %query, "Searched messages");
        Ok(messages)
    }

    /// Marks received messages with `subject` as viewed. Best-effort: every
    /// message sharing the subject may be affected.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn mark_viewed(&self, subject: &str) -> Result<String> {
        self.store.mark_as_viewed(subject).await
    }

    /// Deletes received messages with `subject`. Best-effort, like
    /// [`MailSession::mark_viewed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn delete(&self, subject: &str) -> Result<String> {
        self.store.delete_message(subject).await
    }

    /// Deletes every message received by this account.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn delete_all(&self) -> Result<String> {
        self.store.delete_all_messages().await
    }

    /// Total messages held by the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn total_received_count(&self) -> Result<u64> {
        self.store.get_total_messages().await
    }

    /// Total messages ever sent through the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn total_sent_count(&self) -> Result<u64> {
        self.store.get_total_messages_sent().await
    }

    /// Claims `candidate` for this account. False when it is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn claim_alias(&self, candidate: &str) -> Result<bool> {
        self.store.set_username(candidate, self.store.caller()).await
    }

    /// Alias bound to `principal`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn alias_of(&self, principal: &Principal) -> Result<Option<AliasRecord>> {
        self.store.get_custom_address(principal).await
    }

    /// Account bound to `alias`, if any. The alias is passed through as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn lookup_alias(&self, alias: &str) -> Result<Option<Principal>> {
        self.store.resolve_custom_address(alias).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use threemail_store::{Capability, MemoryLedger};

    fn account(seed: u8) -> Principal {
        Principal::self_authenticating(&[seed; 32])
    }

    #[tokio::test]
    async fn test_one_round_trip_per_call() {
        let ledger = MemoryLedger::new();
        let mail = MailSession::new(ledger.connect_as(account(1)));

        mail.list_mine().await.unwrap();
        mail.list_mine().await.unwrap();
        mail.total_sent_count().await.unwrap();

        assert_eq!(ledger.calls_to(Capability::GetMyMessages).len(), 2);
        assert_eq!(ledger.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_claim_alias_for_own_account() {
        let ledger = MemoryLedger::new();
        let mail = MailSession::new(ledger.connect_as(account(1)));

        assert!(mail.claim_alias("alice").await.unwrap());
        assert_eq!(mail.lookup_alias("alice").await.unwrap(), Some(account(1)));
        assert_eq!(
            mail.alias_of(&account(1)).await.unwrap().map(|r| r.alias),
            Some("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_failures_surface_as_store_errors() {
        let ledger = MemoryLedger::new();
        ledger.fail(Capability::SubmitMessage);
        let mail = MailSession::new(ledger.connect_as(account(1)));

        let result = mail.send(&account(2), "Hi", "there").await;
        assert!(matches!(result, Err(threemail_store::Error::Rejected { .. })));
        assert!(ledger.messages().is_empty());
    }

    #[tokio::test]
    async fn test_resolver_shares_store() {
        let ledger = MemoryLedger::new();
        ledger.insert_alias("bob", account(2));
        let mail = MailSession::new(ledger.connect_as(account(1)));

        let resolved = mail.resolver().resolve("bob").await.unwrap().unwrap();
        assert_eq!(resolved.principal, account(2));
        assert_eq!(ledger.calls()[0].caller, account(1));
    }
}
