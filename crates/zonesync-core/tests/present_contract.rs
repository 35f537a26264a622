//! Contract Test: ensure_present
//!
//! Constraints verified:
//! - One list call per invocation, at most one change call
//! - No write when live state already matches
//! - CREATE by default, UPSERT when overwrite is set
//! - Alias specs are compared in the alias shape only
//!
//! If this test fails, reconciliation is no longer idempotent.

mod common;

use common::*;
use zonesync_core::record::{AliasTarget, Failover};
use zonesync_core::traits::{ChangeAction, ResourceRecord, ResourceRecordSet};
use zonesync_core::{ReconcileOutcome, StubDnsClient, ensure_present};

#[tokio::test]
async fn missing_record_is_created_with_exact_payload() {
    let client = StubDnsClient::new();

    let outcome = ensure_present(&www_spec(), &zone(), &client)
        .await
        .expect("reconciliation succeeds");

    assert!(outcome.is_changed(), "Expected a change, got {:?}", outcome);
    assert_eq!(client.list_call_count(), 1);
    assert_eq!(sent_actions(&client).await, vec![ChangeAction::Create]);

    let expected = ResourceRecordSet {
        name: "www.example.com.".to_string(),
        record_type: "A".to_string(),
        ttl: Some(300),
        resource_records: vec![ResourceRecord::new("192.168.1.2")],
        ..Default::default()
    };
    assert_eq!(sent_record_set(&client, 0).await, expected);

    let request = &client.change_requests().await[0];
    assert_eq!(request.hosted_zone_id, "Z0123456789EXAMPLE");
    assert_eq!(
        request.change_batch.comment.as_deref(),
        Some("zonesync: www.example.com.")
    );
}

#[tokio::test]
async fn second_identical_invocation_is_a_no_op() {
    let client = StubDnsClient::new();
    let spec = www_spec();

    let first = ensure_present(&spec, &zone(), &client).await.unwrap();
    let second = ensure_present(&spec, &zone(), &client).await.unwrap();

    assert!(first.is_changed());
    assert_eq!(second, ReconcileOutcome::Unchanged);
    assert_eq!(
        client.change_call_count(),
        1,
        "Expected 1 write for 2 identical invocations, got {}",
        client.change_call_count()
    );
    assert_eq!(client.list_call_count(), 2);
}

#[tokio::test]
async fn matching_record_with_overwrite_sends_nothing() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.2"],
    )]);

    let outcome = ensure_present(&www_spec().with_overwrite(true), &zone(), &client)
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
    assert_eq!(client.change_call_count(), 0);
}

#[tokio::test]
async fn differing_record_with_overwrite_is_upserted() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.1"],
    )]);

    let outcome = ensure_present(&www_spec().with_overwrite(true), &zone(), &client)
        .await
        .unwrap();

    assert!(outcome.is_changed());
    assert_eq!(sent_actions(&client).await, vec![ChangeAction::Upsert]);
    assert_eq!(
        client.record_sets().await,
        vec![live_value_set("www.example.com.", 300, &["192.168.1.2"])]
    );
}

#[tokio::test]
async fn ttl_difference_counts_as_mismatch() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        60,
        &["192.168.1.2"],
    )]);

    ensure_present(&www_spec().with_overwrite(true), &zone(), &client)
        .await
        .unwrap();

    assert_eq!(sent_actions(&client).await, vec![ChangeAction::Upsert]);
    assert_eq!(sent_record_set(&client, 0).await.ttl, Some(300));
}

#[tokio::test]
async fn name_without_trailing_dot_matches_live_record() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.2"],
    )]);
    let spec = zonesync_core::RecordSpec::new("www.example.com", "A")
        .with_ttl(300)
        .with_values(["192.168.1.2"]);

    let outcome = ensure_present(&spec, &zone(), &client).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
    assert_eq!(client.change_call_count(), 0);
}

#[tokio::test]
async fn value_order_of_input_and_live_record_is_irrelevant() {
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.3", "192.168.1.2"],
    )]);
    let spec = www_spec().with_values(["192.168.1.3", "192.168.1.2"]);

    let outcome = ensure_present(&spec, &zone(), &client).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
}

#[tokio::test]
async fn values_are_sent_sorted() {
    let client = StubDnsClient::new();
    let spec = www_spec().with_values(["b.example.net.", "a.example.net."]);

    ensure_present(&spec, &zone(), &client).await.unwrap();

    let values: Vec<String> = sent_record_set(&client, 0)
        .await
        .resource_records
        .into_iter()
        .map(|r| r.value)
        .collect();
    assert_eq!(values, vec!["a.example.net.", "b.example.net."]);
}

#[tokio::test]
async fn health_check_is_merged_into_writes_only() {
    let check = "abcdef11-2222-3333-4444-555555fedcba";

    // Live record without a health check still satisfies the declaration.
    let client = StubDnsClient::with_record_sets(vec![live_value_set(
        "www.example.com.",
        300,
        &["192.168.1.2"],
    )]);
    let outcome = ensure_present(&www_spec().with_health_check_id(check), &zone(), &client)
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unchanged);

    // When a write happens, the health check travels with it.
    let empty = StubDnsClient::new();
    ensure_present(&www_spec().with_health_check_id(check), &zone(), &empty)
        .await
        .unwrap();
    assert_eq!(
        sent_record_set(&empty, 0).await.health_check_id.as_deref(),
        Some(check)
    );
}

#[tokio::test]
async fn identical_alias_record_sends_nothing() {
    let client = StubDnsClient::with_record_sets(vec![
        live_alias_set("api.example.com.", "secondary", Failover::Secondary),
        live_alias_set("api.example.com.", "primary", Failover::Primary),
    ]);

    let outcome = ensure_present(&primary_alias_spec(), &zone(), &client)
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
    assert_eq!(client.change_call_count(), 0);
}

#[tokio::test]
async fn alias_target_change_is_detected() {
    let client = StubDnsClient::with_record_sets(vec![live_alias_set(
        "api.example.com.",
        "primary",
        Failover::Primary,
    )]);
    let spec = primary_alias_spec()
        .with_overwrite(true)
        .with_alias_target(AliasTarget {
            evaluate_target_health: false,
            ..elb_target()
        });

    ensure_present(&spec, &zone(), &client).await.unwrap();

    assert_eq!(sent_actions(&client).await, vec![ChangeAction::Upsert]);
    let sent = sent_record_set(&client, 0).await;
    assert_eq!(sent.alias_target.map(|t| t.evaluate_target_health), Some(false));
    assert_eq!(sent.set_identifier.as_deref(), Some("primary"));
    assert_eq!(sent.failover, Some(Failover::Primary));
}

#[tokio::test]
async fn alias_spec_never_uses_value_shape() {
    // A value record with the same name must not satisfy an alias spec,
    // even though ttl/values would be irrelevant to the comparison.
    let mut live = live_value_set("api.example.com.", 300, &["192.0.2.10"]);
    live.set_identifier = Some("primary".to_string());
    let client = StubDnsClient::with_record_sets(vec![live]);

    ensure_present(&primary_alias_spec().with_overwrite(true), &zone(), &client)
        .await
        .unwrap();

    let sent = sent_record_set(&client, 0).await;
    assert!(sent.alias_target.is_some());
    assert!(sent.ttl.is_none());
    assert!(sent.resource_records.is_empty());
}
