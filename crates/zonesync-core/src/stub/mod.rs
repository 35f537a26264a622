// # Stub DNS Client
//
// In-process implementation of DnsClient with canned responses.
//
// ## Purpose
//
// Stands in for the provider in tests and dry runs. Selected through
// configuration (`ClientConfig::Stub`) rather than by patching a live client.
//
// ## Behavior
//
// - Every list call returns the seeded record sets
// - Change calls are recorded and applied to the seeded sets, so a second
//   reconciliation observes the first one's write
// - Failures can be injected for list and change calls
//
// Nothing survives the process; there is no persistence.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::config::ClientConfig;
use crate::traits::{
    ChangeAction, ChangeInfo, ChangeResourceRecordSetsRequest, ChangeStatus, DnsClient,
    DnsClientFactory, ListResourceRecordSetsOutput, ResourceRecord, ResourceRecordSet,
};
use crate::{Error, Result};

/// The fabricated record used for delete-path dry runs
pub fn mock_delete_fixture() -> ResourceRecordSet {
    ResourceRecordSet {
        name: "www.mock.com.".to_string(),
        record_type: "A".to_string(),
        ttl: Some(300),
        resource_records: vec![ResourceRecord::new("192.168.1.2")],
        ..Default::default()
    }
}

#[derive(Debug, Default)]
struct StubState {
    record_sets: Vec<ResourceRecordSet>,
    change_requests: Vec<ChangeResourceRecordSetsRequest>,
    list_failure: Option<String>,
    change_failure: Option<(String, String)>,
}

/// Stub DNS client
///
/// Cloning shares state, so a test can keep a handle while the reconciler
/// owns another.
///
/// # Example
///
/// ```rust,no_run
/// use zonesync_core::stub::{StubDnsClient, mock_delete_fixture};
/// use zonesync_core::traits::DnsClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = StubDnsClient::with_record_sets(vec![mock_delete_fixture()]);
///
///     let page = client
///         .list_resource_record_sets("Z0123456789", "www.mock.com.")
///         .await?;
///     assert_eq!(page.resource_record_sets.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubDnsClient {
    inner: Arc<Mutex<StubState>>,
    list_calls: Arc<AtomicUsize>,
    change_calls: Arc<AtomicUsize>,
}

impl StubDnsClient {
    /// Create an empty stub
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stub seeded with record sets
    pub fn with_record_sets(record_sets: Vec<ResourceRecordSet>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubState {
                record_sets,
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Add record sets to the canned listing
    pub async fn seed(&self, record_sets: impl IntoIterator<Item = ResourceRecordSet>) {
        self.inner.lock().await.record_sets.extend(record_sets);
    }

    /// Make every following list call fail with a transport error
    pub async fn fail_lists_with(&self, message: impl Into<String>) {
        self.inner.lock().await.list_failure = Some(message.into());
    }

    /// Make every following change call fail with a service error
    pub async fn fail_changes_with(&self, code: impl Into<String>, message: impl Into<String>) {
        self.inner.lock().await.change_failure = Some((code.into(), message.into()));
    }

    /// Number of list calls so far
    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of change calls so far (including failed ones)
    pub fn change_call_count(&self) -> usize {
        self.change_calls.load(Ordering::SeqCst)
    }

    /// Change requests received so far (including failed ones)
    pub async fn change_requests(&self) -> Vec<ChangeResourceRecordSetsRequest> {
        self.inner.lock().await.change_requests.clone()
    }

    /// Current canned record sets
    pub async fn record_sets(&self) -> Vec<ResourceRecordSet> {
        self.inner.lock().await.record_sets.clone()
    }
}

/// Record sets are identified by name, type and set identifier
fn same_identity(a: &ResourceRecordSet, b: &ResourceRecordSet) -> bool {
    a.name == b.name && a.record_type == b.record_type && a.set_identifier == b.set_identifier
}

fn apply_change(
    record_sets: &mut Vec<ResourceRecordSet>,
    action: ChangeAction,
    set: &ResourceRecordSet,
) -> Result<()> {
    let existing = record_sets.iter().position(|s| same_identity(s, set));

    match (action, existing) {
        (ChangeAction::Create, Some(_)) => Err(Error::service(
            "InvalidChangeBatch",
            format!(
                "Tried to create resource record set [name='{}', type='{}'] but it already exists",
                set.name, set.record_type
            ),
        )),
        (ChangeAction::Create, None) | (ChangeAction::Upsert, None) => {
            record_sets.push(set.clone());
            Ok(())
        }
        (ChangeAction::Upsert, Some(index)) => {
            record_sets[index] = set.clone();
            Ok(())
        }
        (ChangeAction::Delete, Some(index)) => {
            record_sets.remove(index);
            Ok(())
        }
        (ChangeAction::Delete, None) => Err(Error::service(
            "InvalidChangeBatch",
            format!(
                "Tried to delete resource record set [name='{}', type='{}'] but it was not found",
                set.name, set.record_type
            ),
        )),
    }
}

#[async_trait]
impl DnsClient for StubDnsClient {
    async fn list_resource_record_sets(
        &self,
        _hosted_zone_id: &str,
        _start_record_name: &str,
    ) -> Result<ListResourceRecordSetsOutput> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.inner.lock().await;

        if let Some(message) = &state.list_failure {
            return Err(Error::http(message.clone()));
        }

        Ok(ListResourceRecordSetsOutput {
            resource_record_sets: state.record_sets.clone(),
            ..Default::default()
        })
    }

    async fn change_resource_record_sets(
        &self,
        request: &ChangeResourceRecordSetsRequest,
    ) -> Result<ChangeInfo> {
        let seq = self.change_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.inner.lock().await;
        state.change_requests.push(request.clone());

        if let Some((code, message)) = &state.change_failure {
            return Err(Error::service(code.clone(), message.clone()));
        }

        // All-or-nothing, like the provider.
        let mut staged = state.record_sets.clone();
        for change in &request.change_batch.changes {
            apply_change(&mut staged, change.action, &change.resource_record_set)?;
        }
        state.record_sets = staged;

        Ok(ChangeInfo {
            id: format!("/change/STUB{:010}", seq),
            status: ChangeStatus::Insync,
            submitted_at: Some(Utc::now()),
            comment: request.change_batch.comment.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// Factory for creating stub clients
pub struct StubFactory;

impl DnsClientFactory for StubFactory {
    fn create(&self, config: &ClientConfig) -> Result<Box<dyn DnsClient>> {
        match config {
            ClientConfig::Stub { record_sets } => {
                tracing::warn!("Using stub DNS client - no provider calls will be made");
                Ok(Box::new(StubDnsClient::with_record_sets(record_sets.clone())))
            }
            _ => Err(Error::config("Invalid config for stub client")),
        }
    }
}

/// Register the stub client with a registry
pub fn register(registry: &crate::ClientRegistry) {
    registry.register_client("stub", Box::new(StubFactory));
}
