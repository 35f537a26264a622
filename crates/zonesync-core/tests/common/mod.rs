//! Fixtures shared by the reconciliation contract tests

#![allow(dead_code)]

use zonesync_core::record::{AliasTarget, Failover, RecordSpec, ZoneRef};
use zonesync_core::traits::{ChangeAction, ResourceRecord, ResourceRecordSet};
use zonesync_core::StubDnsClient;

/// Zone every test reconciles against
pub fn zone() -> ZoneRef {
    ZoneRef::new("Z0123456789EXAMPLE")
}

/// `www.example.com. A 300 192.168.1.2`, CREATE on mismatch
pub fn www_spec() -> RecordSpec {
    RecordSpec::new("www.example.com.", "A")
        .with_ttl(300)
        .with_values(["192.168.1.2"])
}

/// Live record set with literal values
pub fn live_value_set(name: &str, ttl: u32, values: &[&str]) -> ResourceRecordSet {
    ResourceRecordSet {
        name: name.to_string(),
        record_type: "A".to_string(),
        ttl: Some(ttl),
        resource_records: values.iter().map(|v| ResourceRecord::new(*v)).collect(),
        ..Default::default()
    }
}

/// Load balancer alias target
pub fn elb_target() -> AliasTarget {
    AliasTarget {
        hosted_zone_id: "Z35SXDOTRQ7X7K".to_string(),
        dns_name: "primary-elb-1234567890.us-east-1.elb.amazonaws.com.".to_string(),
        evaluate_target_health: true,
    }
}

/// Primary failover alias spec for `api.example.com.`
pub fn primary_alias_spec() -> RecordSpec {
    RecordSpec::new("api.example.com", "A")
        .with_alias_target(elb_target())
        .with_set_identifier("primary")
        .with_failover(Failover::Primary)
}

/// Live alias record set
pub fn live_alias_set(name: &str, set_identifier: &str, failover: Failover) -> ResourceRecordSet {
    ResourceRecordSet {
        name: name.to_string(),
        record_type: "A".to_string(),
        alias_target: Some(elb_target()),
        set_identifier: Some(set_identifier.to_string()),
        failover: Some(failover),
        ..Default::default()
    }
}

/// Actions of every change request the stub received, in order
pub async fn sent_actions(client: &StubDnsClient) -> Vec<ChangeAction> {
    client
        .change_requests()
        .await
        .iter()
        .flat_map(|request| request.change_batch.changes.iter().map(|c| c.action))
        .collect()
}

/// The single record set of the `index`-th change request
pub async fn sent_record_set(client: &StubDnsClient, index: usize) -> ResourceRecordSet {
    let requests = client.change_requests().await;
    let request = requests.get(index).expect("change request was sent");
    assert_eq!(
        request.change_batch.changes.len(),
        1,
        "Each change batch must carry exactly one change"
    );
    request.change_batch.changes[0].resource_record_set.clone()
}
