//! Core services for mail operations.
//!
//! This module provides the service layer that bridges the front-end
//! with the message store contract.

pub mod mail;

pub use mail::MailSession;
