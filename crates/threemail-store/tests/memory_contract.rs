//! Behaviour of the in-process message store.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use threemail_identity::{Delegation, Identity, Principal};
use threemail_store::{Capability, Connect, Error, MemoryLedger, MessageStore};

fn account(seed: u8) -> Principal {
    Principal::self_authenticating(&[seed; 32])
}

#[tokio::test]
async fn test_submit_reaches_recipient_only() {
    let ledger = MemoryLedger::new();
    let (alice, bob, carol) = (account(1), account(2), account(3));

    let acknowledgement = ledger
        .connect_as(alice.clone())
        .submit_message(&bob, "Lunch", "Noon?")
        .await
        .unwrap();
    assert!(!acknowledgement.is_empty());

    let inbox = ledger.connect_as(bob.clone()).get_my_messages().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].sender, alice);
    assert_eq!(inbox[0].subject, "Lunch");
    assert_eq!(inbox[0].body, "Noon?");
    assert!(!inbox[0].viewed);

    assert!(ledger.connect_as(carol).get_my_messages().await.unwrap().is_empty());

    let sent = ledger.connect_as(alice).get_sent_messages().await.unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient.as_ref(), Some(&bob));
}

#[tokio::test]
async fn test_timestamps_increase() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    let store = ledger.connect_as(alice);

    for subject in ["a", "b", "c"] {
        store.submit_message(&bob, subject, "").await.unwrap();
    }

    let stamps: Vec<u64> = ledger.messages().iter().map(|m| m.timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_subject_operations_hit_every_match() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    let sender = ledger.connect_as(alice);
    for subject in ["Hello", "Hello", "Other"] {
        sender.submit_message(&bob, subject, "").await.unwrap();
    }

    let store = ledger.connect_as(bob);
    store.mark_as_viewed("Hello").await.unwrap();
    let unviewed = store.get_unviewed_messages().await.unwrap();
    assert_eq!(unviewed.len(), 1);
    assert_eq!(unviewed[0].subject, "Other");

    store.delete_message("Hello").await.unwrap();
    let inbox = store.get_my_messages().await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].subject, "Other");
}

#[tokio::test]
async fn test_delete_all_keeps_other_accounts() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    ledger
        .connect_as(alice.clone())
        .submit_message(&bob, "to bob", "")
        .await
        .unwrap();
    ledger
        .connect_as(bob.clone())
        .submit_message(&alice, "to alice", "")
        .await
        .unwrap();

    let store = ledger.connect_as(bob);
    store.delete_all_messages().await.unwrap();
    assert!(store.get_my_messages().await.unwrap().is_empty());
    assert_eq!(store.get_total_messages().await.unwrap(), 1);
    assert_eq!(store.get_total_messages_sent().await.unwrap(), 2);
    assert_eq!(
        ledger.connect_as(alice).get_my_messages().await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_search_is_case_insensitive_substring() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    let sender = ledger.connect_as(alice);
    for subject in ["Quarterly Report", "report draft", "Holidays"] {
        sender.submit_message(&bob, subject, "").await.unwrap();
    }

    let hits = ledger
        .connect_as(bob)
        .search_by_subject("REPORT")
        .await
        .unwrap();
    let subjects: Vec<&str> = hits.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects, ["Quarterly Report", "report draft"]);
}

#[tokio::test]
async fn test_alias_claim_and_resolution() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    let store = ledger.connect_as(alice.clone());

    assert!(store.get_custom_address(&alice).await.unwrap().is_none());
    assert!(store.set_username("alice", &alice).await.unwrap());
    assert_eq!(
        store.resolve_custom_address("alice").await.unwrap(),
        Some(alice.clone())
    );
    assert_eq!(
        store.get_custom_address(&alice).await.unwrap().unwrap().alias,
        "alice"
    );

    // Taken by someone else.
    let other = ledger.connect_as(bob.clone());
    assert!(!other.set_username("alice", &bob).await.unwrap());

    // Re-claiming replaces the old alias.
    assert!(store.set_username("ally", &alice).await.unwrap());
    assert!(store.resolve_custom_address("alice").await.unwrap().is_none());
    assert!(other.set_username("alice", &bob).await.unwrap());
}

#[tokio::test]
async fn test_claim_for_another_account_is_rejected() {
    let ledger = MemoryLedger::new();
    let store = ledger.connect_as(account(1));
    let result = store.set_username("mallory", &account(2)).await;
    assert!(matches!(result, Err(Error::Rejected { .. })));
}

#[tokio::test]
async fn test_sender_alias_is_filled_at_read_time() {
    let ledger = MemoryLedger::new();
    let (alice, bob) = (account(1), account(2));
    let store = ledger.connect_as(alice.clone());
    store.submit_message(&bob, "Hi", "").await.unwrap();

    let inbox = ledger.connect_as(bob.clone()).get_my_messages().await.unwrap();
    assert!(inbox[0].sender_alias.is_none());

    ledger.insert_alias("alice", alice);
    let inbox = ledger.connect_as(bob).get_my_messages().await.unwrap();
    assert_eq!(inbox[0].sender_display(), "alice");
}

#[tokio::test]
async fn test_failure_injection_is_logged() {
    let ledger = MemoryLedger::new();
    let store = ledger.connect_as(account(1));

    ledger.fail(Capability::GetTotalMessages);
    assert!(store.get_total_messages().await.is_err());
    ledger.recover(Capability::GetTotalMessages);
    assert_eq!(store.get_total_messages().await.unwrap(), 0);

    let calls = ledger.calls_to(Capability::GetTotalMessages);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].caller, account(1));

    ledger.clear_calls();
    assert!(ledger.calls().is_empty());
}

#[test]
fn test_connect_binds_channel_principal() {
    let ledger = MemoryLedger::new();
    let identity = Identity::new(
        account(7),
        Delegation::new("token", "key", Utc::now() + Duration::hours(1)),
    );

    let store = ledger.connect(identity.channel()).unwrap();
    assert_eq!(store.caller(), &account(7));
    tokio_test::block_on(store.resolve_custom_address("nobody")).unwrap();
    assert_eq!(
        ledger.calls()[0].argument.as_deref(),
        Some("nobody")
    );
}
