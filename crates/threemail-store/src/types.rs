//! Records exchanged with the message store.

use serde::{Deserialize, Serialize};
use threemail_identity::Principal;

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender account.
    pub sender: Principal,
    /// Sender alias, filled in by the store at read time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_alias: Option<String>,
    /// Recipient account. Older stores leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Principal>,
    /// Subject line. Also the key for per-message operations; not unique.
    pub subject: String,
    /// Message body.
    #[serde(rename = "message")]
    pub body: String,
    /// Nanoseconds since the Unix epoch.
    #[serde(with = "timestamp_serde")]
    pub timestamp: u64,
    /// Whether the recipient marked it as viewed.
    #[serde(default)]
    pub viewed: bool,
}

impl Message {
    /// Display name of the sender: alias when known, principal otherwise.
    #[must_use]
    pub fn sender_display(&self) -> String {
        self.sender_alias
            .clone()
            .unwrap_or_else(|| self.sender.to_text())
    }
}

/// An alias bound to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    /// The alias, lower-case.
    pub alias: String,
    /// The account it belongs to.
    pub owner: Principal,
}

/// Timestamps arrive either as JSON numbers or as decimal strings (64-bit
/// nanosecond values do not survive every JSON encoder as numbers).
mod timestamp_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Number(u64),
        Text(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
    pub fn serialize<S>(timestamp: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*timestamp)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Number(n) => Ok(n),
            Wire::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_number_timestamp() {
        let json = r#"{
            "sender": "em77e-bvlzu-aq",
            "subject": "Hi",
            "message": "Hello there",
            "timestamp": 1700000000000000000,
            "viewed": true
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender.to_text(), "em77e-bvlzu-aq");
        assert_eq!(message.timestamp, 1_700_000_000_000_000_000);
        assert!(message.viewed);
        assert!(message.recipient.is_none());
        assert!(message.sender_alias.is_none());
    }

    #[test]
    fn test_message_from_json_string_timestamp() {
        let json = r#"{
            "sender": "em77e-bvlzu-aq",
            "recipient": "2vxsx-fae",
            "sender_alias": "bob",
            "subject": "Hi",
            "message": "Hello there",
            "timestamp": "18446744073709551615"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.timestamp, u64::MAX);
        assert!(!message.viewed);
        assert_eq!(message.sender_display(), "bob");
    }

    #[test]
    fn test_message_rejects_bad_timestamp() {
        let json = r#"{"sender":"em77e-bvlzu-aq","subject":"","message":"","timestamp":"soon"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn test_sender_display_falls_back_to_principal() {
        let message = Message {
            sender: "em77e-bvlzu-aq".parse().unwrap(),
            sender_alias: None,
            recipient: None,
            subject: String::new(),
            body: String::new(),
            timestamp: 0,
            viewed: false,
        };
        assert_eq!(message.sender_display(), "em77e-bvlzu-aq");
    }
}
