//! # threemail-core
//!
//! Core logic for the 3Mail client.
//!
//! This crate provides:
//! - **Account resolution** - principal first, registered alias second
//! - **Mail session** - one typed method per message store capability
//! - **Session state** - phases, message list, compose form, status line,
//!   in-flight guards
//! - **Coordinator** - login, initialization, mutations and the refreshes
//!   that follow them
//! - **Configuration** - identity provider, store URL, login settings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
mod error;
pub mod resolver;
pub mod service;
pub mod state;

pub use config::ClientConfig;
pub use coordinator::{
    Coordinator, RECIPIENT_NOT_FOUND, SEND_FAILED, SESSION_EXPIRED, alias_taken,
};
pub use error::{Error, Result};
pub use resolver::{AccountResolver, Resolved, Via, normalize_alias};
pub use service::MailSession;
pub use state::{
    ComposeForm, ListTicket, Operation, Phase, Refresh, SessionState, Ticket, View, newest_first,
    refresh_after,
};
