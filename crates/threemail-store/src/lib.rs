//! # threemail-store
//!
//! The 3Mail message store as seen from the client.
//!
//! This crate provides:
//! - The [`MessageStore`] contract: one authenticated round trip per
//!   capability, no caching
//! - Message and alias records
//! - An HTTP transport bound to a signed [`threemail_identity::RequestChannel`]
//! - An in-process store with a call log (feature `memory`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod api;
mod error;
pub mod http;
#[cfg(feature = "memory")]
pub mod memory;
pub mod types;

pub use api::{Capability, Connect, MessageStore};
pub use error::{Error, Result};
pub use http::{HttpConnector, HttpStore};
#[cfg(feature = "memory")]
pub use memory::{Call, MemoryLedger, MemoryStore};
pub use types::{AliasRecord, Message};
