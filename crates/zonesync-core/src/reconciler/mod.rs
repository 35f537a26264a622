//! Record reconciler
//!
//! Brings one record of a hosted zone in line with a [`RecordSpec`].
//!
//! ## Flow
//!
//! ```text
//! RecordSpec ──► desired RecordSet ─┐
//!                                   ├──► equal? ──► Unchanged
//! DnsClient::list ──► current ──────┘       │
//!                                           ▼
//!                         DnsClient::change (CREATE | UPSERT | DELETE)
//! ```
//!
//! Every operation performs exactly one list call and at most one change
//! call. Nothing is retried and nothing is cached between invocations.
//!
//! ## Failure semantics
//!
//! - A failed list call aborts the operation with `Err`.
//! - A change the provider rejects ([`Error::Service`]) is logged and reported
//!   as [`ReconcileOutcome::WriteFailed`]; remote state is left as it was.
//! - Any other change failure (transport) aborts with `Err`.

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::record::{RecordSet, RecordSpec, ZoneRef};
use crate::stub::{StubDnsClient, mock_delete_fixture};
use crate::traits::{
    Change, ChangeAction, ChangeBatch, ChangeInfo, ChangeResourceRecordSetsRequest, DnsClient,
    ResourceRecordSet,
};

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Live state already matched; no write was sent
    Unchanged,

    /// One change was accepted by the provider
    Changed {
        /// The action that was sent
        action: ChangeAction,
        /// Provider acknowledgement
        change: ChangeInfo,
    },

    /// The provider rejected the change; remote state is unchanged
    WriteFailed {
        /// The action that was attempted
        action: ChangeAction,
        /// Provider error message
        error: String,
    },
}

impl ReconcileOutcome {
    /// Whether the provider rejected the write
    pub fn is_failure(&self) -> bool {
        matches!(self, ReconcileOutcome::WriteFailed { .. })
    }

    /// Whether a change was applied
    pub fn is_changed(&self) -> bool {
        matches!(self, ReconcileOutcome::Changed { .. })
    }
}

/// Create or update the record so it matches `spec`
///
/// Sends CREATE (or UPSERT when `spec.overwrite` is set) only if the live
/// record differs from the declaration.
///
/// # Errors
///
/// Returns `Err` if listing the zone fails or the change request could not be
/// delivered. A provider rejection of the change is reported as
/// [`ReconcileOutcome::WriteFailed`].
pub async fn ensure_present(
    spec: &RecordSpec,
    zone: &ZoneRef,
    client: &dyn DnsClient,
) -> Result<ReconcileOutcome> {
    let name = spec.normalized_name();
    warn_on_incomplete_alias(spec);

    let desired = spec.desired_record_set();
    let live = list_live(client, zone, &name).await?;
    let current = current_record_set(spec, &name, &live);

    debug!("current_record_set = {:?}", current);
    debug!("desired_record_set = {:?}", desired);

    if current.as_ref() == Some(&desired) {
        info!("{}: specification already satisfied", name);
        return Ok(ReconcileOutcome::Unchanged);
    }

    let action = if spec.overwrite {
        ChangeAction::Upsert
    } else {
        ChangeAction::Create
    };

    let record_set = desired.to_resource_record_set(spec.health_check_id.as_deref());
    let outcome = change_record(client, zone, action, record_set).await?;

    if outcome.is_changed() {
        match action {
            ChangeAction::Upsert => info!("Record created/modified: {}", name),
            _ => info!("Record created: {}", name),
        }
    }

    Ok(outcome)
}

/// Delete the record described by `spec` if it exists
///
/// The DELETE carries the live record set exactly as the provider holds it,
/// routing fields included. With `spec.mock` set, the listing comes from a
/// stub seeded with [`mock_delete_fixture`] and `client` is not called.
///
/// # Errors
///
/// Same as [`ensure_present`].
pub async fn ensure_absent(
    spec: &RecordSpec,
    zone: &ZoneRef,
    client: &dyn DnsClient,
) -> Result<ReconcileOutcome> {
    let name = spec.normalized_name();

    // Mock mode lists the fabricated record from a seeded stub.
    let mock_client;
    let client: &dyn DnsClient = if spec.mock {
        info!(
            "{}: mock mode, using a stub seeded with the fabricated record instead of the {} client",
            name,
            client.provider_name()
        );
        mock_client = StubDnsClient::with_record_sets(vec![mock_delete_fixture()]);
        &mock_client
    } else {
        client
    };

    let live = list_live(client, zone, &name).await?;
    let by_name = select_by_name(&live, &name);
    let by_identifier = select_by_identifier(&live, &name, spec.set_identifier.as_deref());

    debug!("current_value_record_set = {:?}", by_name.map(RecordSet::value_from));
    debug!("current_alias_record_set = {:?}", by_identifier.and_then(RecordSet::alias_from));

    // Prefer the lookup matching the declared mode.
    let target = if spec.is_alias() {
        by_identifier.or(by_name)
    } else {
        by_name.or(by_identifier)
    };

    let Some(live_set) = target else {
        info!("{}: there is nothing to delete", name);
        return Ok(ReconcileOutcome::Unchanged);
    };

    // The provider only deletes exact matches, routing fields included.
    let mut record_set = live_set.clone();
    if let Some(health_check_id) = &spec.health_check_id {
        record_set.health_check_id = Some(health_check_id.clone());
    }

    let outcome = change_record(client, zone, ChangeAction::Delete, record_set).await?;
    if outcome.is_changed() {
        info!("Record deleted: {}", name);
    }

    Ok(outcome)
}

/// List the zone starting at `name`
async fn list_live(
    client: &dyn DnsClient,
    zone: &ZoneRef,
    name: &str,
) -> Result<Vec<ResourceRecordSet>> {
    let output = client.list_resource_record_sets(zone.id(), name).await?;
    if output.is_truncated {
        debug!(
            "Listing for {} truncated at {:?}; only the first page is consulted",
            name, output.next_record_name
        );
    }
    Ok(output.resource_record_sets)
}

/// First live record set with the given name
fn select_by_name<'a>(live: &'a [ResourceRecordSet], name: &str) -> Option<&'a ResourceRecordSet> {
    live.iter().find(|set| set.name == name)
}

/// First live record set with the given name and set identifier
fn select_by_identifier<'a>(
    live: &'a [ResourceRecordSet],
    name: &str,
    set_identifier: Option<&str>,
) -> Option<&'a ResourceRecordSet> {
    live.iter()
        .find(|set| set.name == name && set.set_identifier.as_deref() == set_identifier)
}

/// Current comparison shape for `spec`'s mode, or `None` if nothing matches
fn current_record_set(
    spec: &RecordSpec,
    name: &str,
    live: &[ResourceRecordSet],
) -> Option<RecordSet> {
    if spec.is_alias() {
        select_by_identifier(live, name, spec.set_identifier.as_deref())
            .and_then(RecordSet::alias_from)
    } else {
        select_by_name(live, name).map(RecordSet::value_from)
    }
}

/// Build the single-change request
fn change_request(
    zone: &ZoneRef,
    action: ChangeAction,
    record_set: ResourceRecordSet,
) -> ChangeResourceRecordSetsRequest {
    let comment = format!("zonesync: {}", record_set.name);
    ChangeResourceRecordSetsRequest {
        hosted_zone_id: zone.id().to_string(),
        change_batch: ChangeBatch {
            comment: Some(comment),
            changes: vec![Change {
                action,
                resource_record_set: record_set,
            }],
        },
    }
}

/// Send one change and classify the result
async fn change_record(
    client: &dyn DnsClient,
    zone: &ZoneRef,
    action: ChangeAction,
    record_set: ResourceRecordSet,
) -> Result<ReconcileOutcome> {
    let request = change_request(zone, action, record_set);

    match client.change_resource_record_sets(&request).await {
        Ok(change) => {
            debug!("Changed record - {}: {:?}", action, change);
            Ok(ReconcileOutcome::Changed { action, change })
        }
        Err(e @ Error::Service { .. }) => {
            error!("Error with {} request: {:?}", action, request);
            error!("{}", e);
            Ok(ReconcileOutcome::WriteFailed {
                action,
                error: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

fn warn_on_incomplete_alias(spec: &RecordSpec) {
    if spec.is_alias() && spec.set_identifier.is_none() {
        warn!(
            "{}: alias record without a set identifier; the provider may reject it",
            spec.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AliasTarget, Failover};
    use crate::traits::ResourceRecord;

    fn value_set(name: &str, values: &[&str]) -> ResourceRecordSet {
        ResourceRecordSet {
            name: name.to_string(),
            record_type: "A".to_string(),
            ttl: Some(300),
            resource_records: values.iter().map(|v| ResourceRecord::new(*v)).collect(),
            ..Default::default()
        }
    }

    fn alias_set(name: &str, set_identifier: &str) -> ResourceRecordSet {
        ResourceRecordSet {
            name: name.to_string(),
            record_type: "A".to_string(),
            set_identifier: Some(set_identifier.to_string()),
            failover: Some(Failover::Primary),
            alias_target: Some(AliasTarget {
                hosted_zone_id: "Z35SXDOTRQ7X7K".to_string(),
                dns_name: "elb.example.net.".to_string(),
                evaluate_target_health: false,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_current_value_sorts_live_values() {
        let spec = RecordSpec::new("www.example.com", "A")
            .with_ttl(300)
            .with_values(["192.0.2.1", "192.0.2.2"]);
        let live = vec![value_set("www.example.com.", &["192.0.2.2", "192.0.2.1"])];

        let current = current_record_set(&spec, "www.example.com.", &live);
        assert_eq!(current, Some(spec.desired_record_set()));
    }

    #[test]
    fn test_current_value_ignores_other_names() {
        let spec = RecordSpec::new("www.example.com", "A");
        let live = vec![value_set("www2.example.com.", &["192.0.2.1"])];

        assert!(current_record_set(&spec, "www.example.com.", &live).is_none());
    }

    #[test]
    fn test_current_alias_matches_set_identifier() {
        let spec = RecordSpec::new("www.example.com", "A")
            .with_set_identifier("secondary")
            .with_alias_target(AliasTarget {
                hosted_zone_id: "Z35SXDOTRQ7X7K".to_string(),
                dns_name: "elb.example.net.".to_string(),
                evaluate_target_health: false,
            });
        let live = vec![
            alias_set("www.example.com.", "primary"),
            alias_set("www.example.com.", "secondary"),
        ];

        match current_record_set(&spec, "www.example.com.", &live) {
            Some(RecordSet::Alias(set)) => {
                assert_eq!(set.set_identifier.as_deref(), Some("secondary"));
            }
            other => panic!("expected alias shape, got {:?}", other),
        }
    }

    #[test]
    fn test_change_request_carries_single_change() {
        let zone = ZoneRef::new("/hostedzone/Z0123456789");
        let request = change_request(
            &zone,
            ChangeAction::Create,
            value_set("www.example.com.", &["192.0.2.1"]),
        );

        assert_eq!(request.hosted_zone_id, "Z0123456789");
        assert_eq!(request.change_batch.changes.len(), 1);
        assert_eq!(
            request.change_batch.comment.as_deref(),
            Some("zonesync: www.example.com.")
        );
    }

    #[tokio::test]
    async fn test_mock_delete_ignores_caller_client() {
        let client = StubDnsClient::new();
        let spec = RecordSpec::new("www.mock.com", "A").with_mock(true);

        let outcome = ensure_absent(&spec, &ZoneRef::new("Z1"), &client)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReconcileOutcome::Changed {
                action: ChangeAction::Delete,
                ..
            }
        ));
        assert_eq!(client.list_call_count(), 0);
        assert_eq!(client.change_call_count(), 0);
    }
}
