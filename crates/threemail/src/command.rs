//! Console commands.
//!
//! Each input line is one command, the console counterpart of a UI event.

use anyhow::{Context, bail};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Session
    /// Log in through the browser.
    Login,
    /// End the session.
    Logout,
    /// Show who is logged in.
    Whoami,

    // Lists
    /// Received messages.
    Inbox,
    /// Received messages not yet viewed.
    Unviewed,
    /// Sent messages.
    Sent,
    /// Received messages by subject.
    Search(String),

    // Messages
    /// Send a message.
    Send {
        /// Principal or alias.
        to: String,
        /// Subject line.
        subject: String,
        /// Body text.
        body: String,
    },
    /// Show a message and mark it viewed.
    View(String),
    /// Delete received messages with a subject.
    Delete(String),
    /// Delete every received message.
    DeleteAll,

    // Account
    /// Claim an alias.
    Alias(String),
    /// Show the counters.
    Counts,

    /// List the commands.
    Help,
    /// Leave.
    Quit,
}

/// One line per command, shown by `help`.
pub const HELP: &str = "\
login                          log in through the browser
logout                         end the session
whoami                         show your 3Mail ID and username
inbox | unviewed | sent        show a message list
search <text>                  search received messages by subject
send <to> <subject> | <body>   send a message to an ID or username
view <subject>                 show a message and mark it viewed
delete <subject>               delete received messages with a subject
delete-all                     delete every received message
alias <name>                   claim a username
counts                         show message counters
help                           show this list
quit                           leave";

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown commands or missing arguments.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        let command = match word.to_lowercase().as_str() {
            "login" => Self::Login,
            "logout" => Self::Logout,
            "whoami" => Self::Whoami,
            "inbox" => Self::Inbox,
            "unviewed" => Self::Unviewed,
            "sent" => Self::Sent,
            "search" => Self::Search(required(rest, "search <text>")?),
            "send" => parse_send(rest)?,
            "view" => Self::View(required(rest, "view <subject>")?),
            "delete" => Self::Delete(required(rest, "delete <subject>")?),
            "delete-all" => Self::DeleteAll,
            "alias" => Self::Alias(required(rest, "alias <name>")?),
            "counts" => Self::Counts,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("Unknown command \"{other}\". Type help for a list."),
        };
        Ok(Some(command))
    }
}

fn required(rest: &str, usage: &str) -> anyhow::Result<String> {
    if rest.is_empty() {
        bail!("Usage: {usage}");
    }
    Ok(rest.to_string())
}

/// `<to> <subject> | <body>`; the body is optional.
fn parse_send(rest: &str) -> anyhow::Result<Command> {
    const USAGE: &str = "Usage: send <to> <subject> | <body>";

    let (to, rest) = rest
        .split_once(char::is_whitespace)
        .context(USAGE)?;
    let (subject, body) = rest.split_once('|').unwrap_or((rest, ""));

    let subject = subject.trim();
    if subject.is_empty() {
        bail!(USAGE);
    }

    Ok(Command::Send {
        to: to.to_string(),
        subject: subject.to_string(),
        body: body.trim().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::parse("inbox").unwrap(), Some(Command::Inbox));
        assert_eq!(Command::parse("  LOGOUT ").unwrap(), Some(Command::Logout));
        assert_eq!(Command::parse("delete-all").unwrap(), Some(Command::DeleteAll));
        assert_eq!(Command::parse("").unwrap(), None);
    }

    #[test]
    fn test_argument_commands() {
        assert_eq!(
            Command::parse("search quarterly report").unwrap(),
            Some(Command::Search("quarterly report".into()))
        );
        assert_eq!(
            Command::parse("alias  Alice").unwrap(),
            Some(Command::Alias("Alice".into()))
        );
        assert!(Command::parse("view").is_err());
    }

    #[test]
    fn test_send() {
        assert_eq!(
            Command::parse("send bob Lunch plans | Noon at the usual place?").unwrap(),
            Some(Command::Send {
                to: "bob".into(),
                subject: "Lunch plans".into(),
                body: "Noon at the usual place?".into(),
            })
        );
        assert_eq!(
            Command::parse("send em77e-bvlzu-aq Ping").unwrap(),
            Some(Command::Send {
                to: "em77e-bvlzu-aq".into(),
                subject: "Ping".into(),
                body: String::new(),
            })
        );
        assert!(Command::parse("send bob").is_err());
        assert!(Command::parse("send bob | body only").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("frobnicate").unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }
}
