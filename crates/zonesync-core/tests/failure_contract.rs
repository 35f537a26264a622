//! Contract Test: failure handling
//!
//! Constraints verified:
//! - A provider rejection of the write is reported as WriteFailed, not Err
//! - A rejected write is never retried
//! - A failed read aborts before any write

mod common;

use common::*;
use zonesync_core::traits::ChangeAction;
use zonesync_core::{Error, ReconcileOutcome, StubDnsClient, ensure_absent, ensure_present};

#[tokio::test]
async fn rejected_write_is_reported_without_retry() {
    let client = StubDnsClient::new();
    client
        .fail_changes_with("InvalidChangeBatch", "RRSet of type A with DNS name www.example.com. is not permitted")
        .await;

    let outcome = ensure_present(&www_spec(), &zone(), &client)
        .await
        .expect("a rejected write does not raise");

    match outcome {
        ReconcileOutcome::WriteFailed { action, error } => {
            assert_eq!(action, ChangeAction::Create);
            assert!(error.contains("InvalidChangeBatch"));
        }
        other => panic!("Expected WriteFailed, got {:?}", other),
    }
    assert_eq!(client.change_call_count(), 1, "Rejected writes must not be retried");
    assert!(client.record_sets().await.is_empty());
}

#[tokio::test]
async fn create_over_differing_record_is_rejected_by_provider() {
    // Without overwrite the CREATE collides with the live record.
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.1"],
    )]);

    let outcome = ensure_present(&www_spec(), &zone(), &client).await.unwrap();

    assert!(outcome.is_failure());
    assert_eq!(
        client.record_sets().await,
        vec![live_value_set("www.example.com.", 300, &["192.168.1.1"])],
        "Remote state must be left as it was"
    );
}

#[tokio::test]
async fn rejected_delete_is_reported() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.2"],
    )]);
    client.fail_changes_with("Throttling", "Rate exceeded").await;

    let outcome = ensure_absent(&www_spec(), &zone(), &client).await.unwrap();

    assert!(matches!(
        outcome,
        ReconcileOutcome::WriteFailed {
            action: ChangeAction::Delete,
            ..
        }
    ));
}

#[tokio::test]
async fn failed_read_aborts_before_writing() {
    let client = StubDnsClient::new();
    client.fail_lists_with("connection refused").await;

    let present = ensure_present(&www_spec(), &zone(), &client).await;
    let absent = ensure_absent(&www_spec(), &zone(), &client).await;

    assert!(matches!(present, Err(Error::Http(_))));
    assert!(matches!(absent, Err(Error::Http(_))));
    assert_eq!(client.change_call_count(), 0);
}
