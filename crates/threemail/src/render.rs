//! Plain-text rendering of the session state.

use std::fmt::Write;

use chrono::{DateTime, Local};
use threemail_core::{SessionState, View};
use threemail_store::Message;

/// Widest subject shown in a list row.
const SUBJECT_WIDTH: usize = 40;

/// Status line and alert, if any.
pub fn notices(state: &SessionState) -> String {
    let mut out = String::new();
    if let Some(alert) = state.alert() {
        let _ = writeln!(out, "!! {alert}");
    }
    if let Some(status) = state.status() {
        let _ = writeln!(out, "{status}");
    }
    out
}

/// Who is logged in.
pub fn identity(state: &SessionState) -> String {
    let Some(principal) = state.principal() else {
        return "Not logged in.\n".to_string();
    };

    let mut out = format!("Your 3Mail ID - {principal}\n");
    match state.alias() {
        Some(alias) => {
            let _ = writeln!(out, "Your username - {alias}");
        }
        None if state.alias_prompt() => {
            out.push_str("No username yet. Claim one with: alias <name>\n");
        }
        None => {}
    }
    out
}

/// Both counters.
pub fn counts(state: &SessionState) -> String {
    format!(
        "Total messages: {}\nTotal sent: {}\n",
        state.received_count(),
        state.sent_count()
    )
}

/// The current message list, one row per message.
pub fn message_list(state: &SessionState) -> String {
    let view = state.view();
    let messages = state.messages();
    let mut out = format!("{view} ({})\n", messages.len());

    if messages.is_empty() {
        out.push_str("  No messages.\n");
        return out;
    }

    for message in messages {
        let marker = if message.viewed || view == &View::Sent {
            ' '
        } else {
            '*'
        };
        let party = if view == &View::Sent {
            message
                .recipient
                .as_ref()
                .map_or_else(|| "?".to_string(), |to| format!("to {to}"))
        } else {
            message.sender_display()
        };
        let _ = writeln!(
            out,
            "{marker} {}  {:<width$}  {party}",
            timestamp(message.timestamp),
            truncate(&message.subject, SUBJECT_WIDTH),
            width = SUBJECT_WIDTH,
        );
    }
    out
}

/// One message in full.
pub fn message(message: &Message) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "From:    {}", message.sender_display());
    if let Some(recipient) = &message.recipient {
        let _ = writeln!(out, "To:      {recipient}");
    }
    let _ = writeln!(out, "Date:    {}", timestamp(message.timestamp));
    let _ = writeln!(out, "Subject: {}", message.subject);
    let _ = writeln!(out, "\n{}", message.body);
    out
}

/// Nanoseconds since the epoch, in local time.
fn timestamp(nanos: u64) -> String {
    i64::try_from(nanos).map_or_else(
        |_| "----------------".to_string(),
        |nanos| {
            DateTime::from_timestamp_nanos(nanos)
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
