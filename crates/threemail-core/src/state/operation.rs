//! Operation kinds, their refresh policy, and in-flight tickets.

use std::fmt;

/// Kinds of request a session issues. At most one of each kind is in
/// flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Interactive login.
    Login,
    /// Post-login initialization.
    Initialize,
    /// Fetching a message list.
    List,
    /// Sending the compose form.
    Send,
    /// Marking a subject as viewed.
    MarkViewed,
    /// Deleting a subject.
    Delete,
    /// Deleting every received message.
    DeleteAll,
    /// Claiming an alias.
    ClaimAlias,
    /// Re-reading the counters.
    RefreshCounts,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Initialize => "initialization",
            Self::List => "message list",
            Self::Send => "send",
            Self::MarkViewed => "mark as viewed",
            Self::Delete => "delete",
            Self::DeleteAll => "delete all",
            Self::ClaimAlias => "alias claim",
            Self::RefreshCounts => "counter refresh",
        };
        f.write_str(name)
    }
}

/// What to re-read after a mutation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Re-fetch the list currently shown.
    CurrentList,
    /// Empty the list locally without a round trip.
    ClearList,
    /// Re-read the received counter.
    ReceivedCount,
    /// Re-read the sent counter.
    SentCount,
}

/// Refresh steps chained after `operation` succeeds, in order.
#[must_use]
pub const fn refresh_after(operation: Operation) -> &'static [Refresh] {
    match operation {
        Operation::Send => &[Refresh::SentCount, Refresh::ReceivedCount],
        Operation::MarkViewed => &[Refresh::CurrentList],
        Operation::Delete => &[Refresh::CurrentList, Refresh::ReceivedCount],
        Operation::DeleteAll => &[Refresh::ClearList, Refresh::ReceivedCount],
        Operation::Login
        | Operation::Initialize
        | Operation::List
        | Operation::ClaimAlias
        | Operation::RefreshCounts => &[],
    }
}

/// Proof that an operation is in flight. Hand it back to
/// [`SessionState::finish`](super::SessionState::finish).
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unfinished ticket keeps the operation busy"]
pub struct Ticket {
    pub(super) operation: Operation,
}

impl Ticket {
    /// The operation this ticket holds.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }
}

/// Sequence number of one list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[must_use]
pub struct ListTicket(pub(super) u64);
