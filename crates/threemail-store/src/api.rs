//! The message store contract.

use std::fmt;
use std::future::Future;

use threemail_identity::{Principal, RequestChannel};

use crate::error::Result;
use crate::types::{AliasRecord, Message};

/// Remote capabilities of the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Store a message for a recipient.
    SubmitMessage,
    /// Messages received by the caller.
    GetMyMessages,
    /// Received messages not yet viewed.
    GetUnviewedMessages,
    /// Messages sent by the caller.
    GetSentMessages,
    /// Received messages by subject.
    SearchBySubject,
    /// Mark received messages with a subject as viewed.
    MarkAsViewed,
    /// Delete received messages with a subject.
    DeleteMessage,
    /// Delete every received message.
    DeleteAllMessages,
    /// Total messages held by the store.
    GetTotalMessages,
    /// Total messages ever sent through the store.
    GetTotalMessagesSent,
    /// Alias of an account.
    GetCustomAddress,
    /// Account behind an alias.
    ResolveCustomAddress,
    /// Claim an alias.
    SetUsername,
}

impl Capability {
    /// Name of the capability on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmitMessage => "submitMessage",
            Self::GetMyMessages => "getMyMessages",
            Self::GetUnviewedMessages => "getUnviewedMessages",
            Self::GetSentMessages => "getSentMessages",
            Self::SearchBySubject => "searchBySubject",
            Self::MarkAsViewed => "markAsViewed",
            Self::DeleteMessage => "deleteMessage",
            Self::DeleteAllMessages => "deleteAllMessages",
            Self::GetTotalMessages => "getTotalMessages",
            Self::GetTotalMessagesSent => "getTotalMessagesSent",
            Self::GetCustomAddress => "getCustomAddress",
            Self::ResolveCustomAddress => "resolveCustomAddress",
            Self::SetUsername => "setUsername",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated request/response access to the message store.
///
/// Every method is exactly one round trip made on behalf of
/// [`MessageStore::caller`]. Nothing is cached.
///
/// Subject-keyed operations (`mark_as_viewed`, `delete_message`) are
/// best-effort: the store decides how many messages a subject matches.
pub trait MessageStore: Send + Sync {
    /// The account requests are made for.
    fn caller(&self) -> &Principal;

    /// Stores a message for `recipient`. Returns the store's acknowledgement.
    fn submit_message(
        &self,
        recipient: &Principal,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Messages received by the caller, in store order.
    fn get_my_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Received messages not yet viewed, in store order.
    fn get_unviewed_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Messages sent by the caller, in store order.
    fn get_sent_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Received messages matching a subject query, in store order.
    fn search_by_subject(&self, query: &str)
    -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Marks received messages with `subject` as viewed.
    fn mark_as_viewed(&self, subject: &str) -> impl Future<Output = Result<String>> + Send;

    /// Deletes received messages with `subject`.
    fn delete_message(&self, subject: &str) -> impl Future<Output = Result<String>> + Send;

    /// Deletes all messages received by the caller.
    fn delete_all_messages(&self) -> impl Future<Output = Result<String>> + Send;

    /// Total messages held by the store.
    fn get_total_messages(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Total messages ever sent through the store.
    fn get_total_messages_sent(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Alias bound to `account`, if any.
    fn get_custom_address(
        &self,
        account: &Principal,
    ) -> impl Future<Output = Result<Option<AliasRecord>>> + Send;

    /// Account bound to `alias`, if any.
    fn resolve_custom_address(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<Option<Principal>>> + Send;

    /// Claims `candidate` for `account`. False when the alias is taken.
    fn set_username(
        &self,
        candidate: &str,
        account: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Opens a message store session over a signed request channel.
pub trait Connect {
    /// The store handle produced.
    type Store: MessageStore;

    /// Binds a store handle to the channel's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be set up.
    fn connect(&self, channel: RequestChannel) -> Result<Self::Store>;
}
