//! The one ordering every message list is shown in.

use threemail_store::Message;

/// Sorts newest first by timestamp. Messages with equal timestamps keep
/// the order the store returned them in.
pub fn newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use threemail_identity::Principal;

    fn message(subject: &str, timestamp: u64) -> Message {
        Message {
            sender: Principal::anonymous(),
            sender_alias: None,
            recipient: None,
            subject: subject.to_string(),
            body: String::new(),
            timestamp,
            viewed: false,
        }
    }

    #[test]
    fn test_newest_first() {
        let mut messages = vec![message("A", 100), message("B", 300)];
        newest_first(&mut messages);
        let subjects: Vec<&str> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, ["B", "A"]);
    }

    #[test]
    fn test_ties_keep_store_order() {
        let mut messages = vec![message("first", 5), message("second", 5), message("old", 1)];
        newest_first(&mut messages);
        let subjects: Vec<&str> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, ["first", "second", "old"]);
    }

    proptest! {
        #[test]
        fn prop_non_increasing(stamps in proptest::collection::vec(0u64..50, 0..40)) {
            let mut messages: Vec<Message> = stamps
                .iter()
                .enumerate()
                .map(|(i, t)| message(&i.to_string(), *t))
                .collect();
            newest_first(&mut messages);

            prop_assert!(messages.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
            for w in messages.windows(2) {
                if w[0].timestamp == w[1].timestamp {
                    let a: usize = w[0].subject.parse().unwrap();
                    let b: usize = w[1].subject.parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
