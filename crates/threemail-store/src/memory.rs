//! In-process message store.
//!
//! A [`MemoryLedger`] holds messages, aliases and counters for any number of
//! accounts; [`MemoryStore`] handles are bound to one caller. Every call is
//! recorded so tests can assert on the round trips a client made, and
//! capabilities can be made to fail on demand.
//!
//! Semantics where the contract leaves room:
//! - subject-keyed operations affect every received message with exactly
//!   that subject,
//! - search is a case-insensitive substring match on received subjects,
//! - claiming an alias replaces the account's previous alias.

use std::collections::{HashMap, HashSet};
use std::future::{Future, ready};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use threemail_identity::{Principal, RequestChannel};

use crate::api::{Capability, Connect, MessageStore};
use crate::error::{Error, Result};
use crate::types::{AliasRecord, Message};

/// One recorded round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Who made the call.
    pub caller: Principal,
    /// What was called.
    pub capability: Capability,
    /// The main text argument, if the capability takes one.
    pub argument: Option<String>,
}

#[derive(Debug, Default)]
struct Ledger {
    messages: Vec<Message>,
    aliases: HashMap<String, Principal>,
    sent_total: u64,
    clock: u64,
    calls: Vec<Call>,
    failing: HashSet<Capability>,
}

impl Ledger {
    fn alias_of(&self, account: &Principal) -> Option<String> {
        self.aliases
            .iter()
            .find(|(_, owner)| *owner == account)
            .map(|(alias, _)| alias.clone())
    }

    /// Strictly increasing nanosecond timestamps.
    fn tick(&mut self) -> u64 {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();
        self.clock = now.max(self.clock + 1);
        self.clock
    }

    fn project(&self, message: &Message) -> Message {
        let mut message = message.clone();
        message.sender_alias = self.alias_of(&message.sender);
        message
    }

    fn received_by<'a>(&'a self, caller: &'a Principal) -> impl Iterator<Item = &'a Message> {
        self.messages
            .iter()
            .filter(move |m| m.recipient.as_ref() == Some(caller))
    }
}

/// Shared state behind every [`MemoryStore`] handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a store handle acting as `caller`.
    #[must_use]
    pub fn connect_as(&self, caller: Principal) -> MemoryStore {
        MemoryStore {
            ledger: self.clone(),
            caller,
        }
    }

    /// Adds a message directly, bypassing the call log.
    pub fn insert(&self, message: Message) {
        self.lock().messages.push(message);
    }

    /// Binds an alias directly, bypassing the call log.
    pub fn insert_alias(&self, alias: &str, owner: Principal) {
        self.lock().aliases.insert(alias.to_lowercase(), owner);
    }

    /// Every message held, in insertion order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Every call made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls made to one capability.
    #[must_use]
    pub fn calls_to(&self, capability: Capability) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.capability == capability)
            .cloned()
            .collect()
    }

    /// Forgets the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Makes every later call to `capability` fail.
    pub fn fail(&self, capability: Capability) {
        self.lock().failing.insert(capability);
    }

    /// Undoes [`MemoryLedger::fail`].
    pub fn recover(&self, capability: Capability) {
        self.lock().failing.remove(&capability);
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connect for MemoryLedger {
    type Store = MemoryStore;

    fn connect(&self, channel: RequestChannel) -> Result<MemoryStore> {
        Ok(self.connect_as(channel.principal().clone()))
    }
}

/// Handle on a [`MemoryLedger`] acting as one caller.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    ledger: MemoryLedger,
    caller: Principal,
}

impl MemoryStore {
    /// Records the call and hands out the ledger unless the capability is
    /// set to fail.
    fn enter(
        &self,
        capability: Capability,
        argument: Option<&str>,
    ) -> Result<MutexGuard<'_, Ledger>> {
        let mut ledger = self.ledger.lock();
        ledger.calls.push(Call {
            caller: self.caller.clone(),
            capability,
            argument: argument.map(str::to_string),
        });

        if ledger.failing.contains(&capability) {
            return Err(Error::rejected(capability.as_str(), "store unavailable"));
        }
        Ok(ledger)
    }

    fn submit(&self, recipient: &Principal, subject: &str, body: &str) -> Result<String> {
        let mut ledger = self.enter(Capability::SubmitMessage, Some(subject))?;
        let timestamp = ledger.tick();
        ledger.messages.push(Message {
            sender: self.caller.clone(),
            sender_alias: None,
            recipient: Some(recipient.clone()),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp,
            viewed: false,
        });
        ledger.sent_total += 1;
        Ok("Message submitted successfully.".to_string())
    }

    fn list(&self, capability: Capability, query: Option<&str>) -> Result<Vec<Message>> {
        let ledger = self.enter(capability, query)?;
        let caller = &self.caller;
        let needle = query.map(str::to_lowercase);

        let messages: Vec<Message> = match capability {
            Capability::GetSentMessages => ledger
                .messages
                .iter()
                .filter(|m| &m.sender == caller)
                .map(|m| ledger.project(m))
                .collect(),
            Capability::GetUnviewedMessages => ledger
                .received_by(caller)
                .filter(|m| !m.viewed)
                .map(|m| ledger.project(m))
                .collect(),
            Capability::SearchBySubject => ledger
                .received_by(caller)
                .filter(|m| {
                    needle
                        .as_deref()
                        .is_some_and(|n| m.subject.to_lowercase().contains(n))
                })
                .map(|m| ledger.project(m))
                .collect(),
            _ => ledger
                .received_by(caller)
                .map(|m| ledger.project(m))
                .collect(),
        };
        Ok(messages)
    }

    fn mark(&self, subject: &str) -> Result<String> {
        let mut ledger = self.enter(Capability::MarkAsViewed, Some(subject))?;
        let mut count = 0;
        for message in &mut ledger.messages {
            if message.recipient.as_ref() == Some(&self.caller) && message.subject == subject {
                message.viewed = true;
                count += 1;
            }
        }
        Ok(format!("Marked {count} message(s) as viewed."))
    }

    fn remove(&self, capability: Capability, subject: Option<&str>) -> Result<String> {
        let mut ledger = self.enter(capability, subject)?;
        let before = ledger.messages.len();
        let caller = self.caller.clone();
        ledger.messages.retain(|m| {
            let mine = m.recipient.as_ref() == Some(&caller);
            !(mine && subject.is_none_or(|s| m.subject == s))
        });
        let removed = before - ledger.messages.len();
        Ok(match subject {
            Some(_) => format!("Deleted {removed} message(s)."),
            None => format!("Deleted all {removed} message(s)."),
        })
    }

    fn count(&self, capability: Capability) -> Result<u64> {
        let ledger = self.enter(capability, None)?;
        Ok(match capability {
            Capability::GetTotalMessagesSent => ledger.sent_total,
            _ => ledger.messages.len() as u64,
        })
    }

    fn alias_record(&self, account: &Principal) -> Result<Option<AliasRecord>> {
        let text = account.to_text();
        let ledger = self.enter(Capability::GetCustomAddress, Some(&text))?;
        Ok(ledger.alias_of(account).map(|alias| AliasRecord {
            alias,
            owner: account.clone(),
        }))
    }

    fn lookup(&self, alias: &str) -> Result<Option<Principal>> {
        let ledger = self.enter(Capability::ResolveCustomAddress, Some(alias))?;
        Ok(ledger.aliases.get(&alias.to_lowercase()).cloned())
    }

    fn claim(&self, candidate: &str, account: &Principal) -> Result<bool> {
        let mut ledger = self.enter(Capability::SetUsername, Some(candidate))?;
        if account != &self.caller {
            return Err(Error::rejected(
                Capability::SetUsername.as_str(),
                "cannot claim an alias for another account",
            ));
        }

        let key = candidate.to_lowercase();
        if let Some(owner) = ledger.aliases.get(&key) {
            return Ok(owner == account);
        }

        ledger.aliases.retain(|_, owner| owner != account);
        ledger.aliases.insert(key, account.clone());
        Ok(true)
    }
}

impl MessageStore for MemoryStore {
    fn caller(&self) -> &Principal {
        &self.caller
    }

    fn submit_message(
        &self,
        recipient: &Principal,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        ready(self.submit(recipient, subject, body))
    }

    fn get_my_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send {
        ready(self.list(Capability::GetMyMessages, None))
    }

    fn get_unviewed_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send {
        ready(self.list(Capability::GetUnviewedMessages, None))
    }

    fn get_sent_messages(&self) -> impl Future<Output = Result<Vec<Message>>> + Send {
        ready(self.list(Capability::GetSentMessages, None))
    }

    fn search_by_subject(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send {
        ready(self.list(Capability::SearchBySubject, Some(query)))
    }

    fn mark_as_viewed(&self, subject: &str) -> impl Future<Output = Result<String>> + Send {
        ready(self.mark(subject))
    }

    fn delete_message(&self, subject: &str) -> impl Future<Output = Result<String>> + Send {
        ready(self.remove(Capability::DeleteMessage, Some(subject)))
    }

    fn delete_all_messages(&self) -> impl Future<Output = Result<String>> + Send {
        ready(self.remove(Capability::DeleteAllMessages, None))
    }

    fn get_total_messages(&self) -> impl Future<Output = Result<u64>> + Send {
        ready(self.count(Capability::GetTotalMessages))
    }

    fn get_total_messages_sent(&self) -> impl Future<Output = Result<u64>> + Send {
        ready(self.count(Capability::GetTotalMessagesSent))
    }

    fn get_custom_address(
        &self,
        account: &Principal,
    ) -> impl Future<Output = Result<Option<AliasRecord>>> + Send {
        ready(self.alias_record(account))
    }

    fn resolve_custom_address(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<Option<Principal>>> + Send {
        ready(self.lookup(alias))
    }

    fn set_username(
        &self,
        candidate: &str,
        account: &Principal,
    ) -> impl Future<Output = Result<bool>> + Send {
        ready(self.claim(candidate, account))
    }
}
