//! Session view state.
//!
//! [`SessionState`] is everything a front-end renders: the phase, who is
//! logged in, the message list, the compose form and the status line. It
//! also tracks which operations are in flight and which list response was
//! applied last, so front-ends that split requests from responses can drop
//! duplicates and stale answers.

mod compose;
mod operation;
mod ordering;

use std::collections::HashSet;
use std::fmt;

use threemail_identity::Principal;
use threemail_store::Message;
use tracing::debug;

use crate::error::{Error, Result};

pub use compose::ComposeForm;
pub use operation::{ListTicket, Operation, Refresh, Ticket, refresh_after};
pub use ordering::newest_first;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No identity.
    #[default]
    Unauthenticated,
    /// Identity held, first fetches running.
    Initializing,
    /// Identity held and initialized.
    Ready,
}

impl Phase {
    /// Returns true if the session may move from `self` to `to`.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Unauthenticated, Self::Initializing)
                | (Self::Initializing, Self::Ready)
                | (Self::Ready, Self::Unauthenticated)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Which list is on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum View {
    /// Received messages.
    #[default]
    Inbox,
    /// Received messages not yet viewed.
    Unviewed,
    /// Sent messages.
    Sent,
    /// Received messages matching a subject query.
    Search(String),
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbox => f.write_str("Inbox"),
            Self::Unviewed => f.write_str("Unviewed"),
            Self::Sent => f.write_str("Sent"),
            Self::Search(query) => write!(f, "Search \"{query}\""),
        }
    }
}

/// Everything shown for one session.
#[derive(Debug, Default)]
pub struct SessionState {
    phase: Phase,
    principal: Option<Principal>,
    alias: Option<String>,
    alias_prompt: bool,
    view: View,
    messages: Vec<Message>,
    compose: ComposeForm,
    status: Option<String>,
    alert: Option<String>,
    received_count: u64,
    sent_count: u64,
    in_flight: HashSet<Operation>,
    next_list: u64,
    applied_list: Option<u64>,
}

impl SessionState {
    /// Creates the logged-out state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The logged-in account.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The account's alias, if one is claimed.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// True when the user should be invited to claim an alias.
    #[must_use]
    pub const fn alias_prompt(&self) -> bool {
        self.alias_prompt
    }

    /// The list on screen.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Messages of the current view, newest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The compose form.
    #[must_use]
    pub const fn compose(&self) -> &ComposeForm {
        &self.compose
    }

    /// The compose form, for editing.
    pub const fn compose_mut(&mut self) -> &mut ComposeForm {
        &mut self.compose
    }

    /// The status line.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// A message the user has to acknowledge.
    #[must_use]
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Acknowledges the alert.
    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Total messages held by the store.
    #[must_use]
    pub const fn received_count(&self) -> u64 {
        self.received_count
    }

    /// Total messages ever sent through the store.
    #[must_use]
    pub const fn sent_count(&self) -> u64 {
        self.sent_count
    }

    /// Returns true while a request of this kind is outstanding.
    #[must_use]
    pub fn is_busy(&self, operation: Operation) -> bool {
        self.in_flight.contains(&operation)
    }

    /// Moves to phase `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] unless the move is
    /// unauthenticated → initializing → ready → unauthenticated.
    pub fn transition(&mut self, to: Phase) -> Result<()> {
        if !self.phase.can_transition(to) {
            return Err(Error::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        debug!("Session {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Marks `operation` as in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] if one of the same kind is outstanding.
    pub fn begin(&mut self, operation: Operation) -> Result<Ticket> {
        if !self.in_flight.insert(operation) {
            return Err(Error::Busy(operation));
        }
        Ok(Ticket { operation })
    }

    /// Releases an in-flight operation.
    pub fn finish(&mut self, ticket: Ticket) {
        self.in_flight.remove(&ticket.operation);
    }

    /// Numbers a new list request.
    pub const fn issue_list(&mut self) -> ListTicket {
        self.next_list += 1;
        ListTicket(self.next_list)
    }

    /// Shows `messages` as the list for `view`, newest first.
    ///
    /// Returns false, leaving the list alone, when a response to a later
    /// request has already been applied.
    pub fn apply_list(&mut self, ticket: ListTicket, view: View, mut messages: Vec<Message>) -> bool {
        if self.applied_list.is_some_and(|applied| ticket.0 <= applied) {
            debug!(sequence = ticket.0, "Dropping stale list response");
            return false;
        }

        newest_first(&mut messages);
        self.applied_list = Some(ticket.0);
        self.view = view;
        self.messages = messages;
        true
    }

    /// Empties the list locally.
    pub fn clear_list(&mut self) {
        self.messages.clear();
    }

    /// Sets the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Clears the status line.
    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Drops everything; back to the logged-out state.
    ///
    /// List numbering carries on, so answers to requests issued before the
    /// reset are dropped.
    pub fn reset(&mut self) {
        let issued = self.next_list;
        *self = Self {
            next_list: issued,
            applied_list: Some(issued),
            ..Self::default()
        };
    }

    pub(crate) fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub(crate) fn set_alias(&mut self, alias: Option<String>) {
        self.alias_prompt = alias.is_none();
        self.alias = alias;
    }

    pub(crate) fn raise_alert(&mut self, alert: impl Into<String>) {
        self.alert = Some(alert.into());
    }

    pub(crate) const fn set_received_count(&mut self, count: u64) {
        self.received_count = count;
    }

    pub(crate) const fn set_sent_count(&mut self, count: u64) {
        self.sent_count = count;
    }
}
