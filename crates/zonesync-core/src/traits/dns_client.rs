// # DNS Client Trait
//
// Defines the capability a hosted-zone API must expose to the reconciler:
// one read (list record sets) and one write (change record sets).
//
// ## Implementations
//
// - Route 53: `zonesync-provider-route53` crate
// - Stub: `zonesync_core::stub::StubDnsClient` (tests and dry runs)
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::traits::DnsClient;
//
// async fn dump(client: &dyn DnsClient) -> zonesync_core::Result<()> {
//     let page = client
//         .list_resource_record_sets("Z0123456789", "www.example.com.")
//         .await?;
//     for set in page.resource_record_sets {
//         println!("{} {}", set.name, set.record_type);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::{AliasTarget, Failover};

/// One literal value of a record set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Record data (an address, a hostname, quoted TXT data, ...)
    pub value: String,
}

impl ResourceRecord {
    /// Create a resource record from a value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// A record set as the provider stores and transmits it
///
/// This is the full provider shape; the reconciler narrows it to a
/// [`crate::record::RecordSet`] before comparing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Fully-qualified name with trailing dot
    pub name: String,
    /// Record type ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,
    /// Time-to-live in seconds (absent for alias records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Literal values (empty for alias records)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_records: Vec<ResourceRecord>,
    /// Alias target, when the record points at another provider resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_target: Option<AliasTarget>,
    /// Distinguishes record sets sharing a name and type (routing policies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Failover role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover: Option<Failover>,
    /// Associated health check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
}

/// Change action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Create; rejected by the provider if the record set exists
    Create,
    /// Delete; the record set must match the live one exactly
    Delete,
    /// Create or replace
    Upsert,
}

impl ChangeAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
            ChangeAction::Upsert => "UPSERT",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single mutation inside a change batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What to do
    pub action: ChangeAction,
    /// The record set to act on
    pub resource_record_set: ResourceRecordSet,
}

/// An atomic set of mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Free-form comment stored with the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Mutations, applied all-or-nothing
    pub changes: Vec<Change>,
}

/// Write request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeResourceRecordSetsRequest {
    /// Bare hosted zone id (no `/hostedzone/` prefix)
    pub hosted_zone_id: String,
    /// The batch to apply
    pub change_batch: ChangeBatch,
}

/// First page of a record listing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListResourceRecordSetsOutput {
    /// Record sets, ordered by name starting at the requested name
    pub resource_record_sets: Vec<ResourceRecordSet>,
    /// Whether more pages exist
    #[serde(default)]
    pub is_truncated: bool,
    /// Name to continue from when truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_record_name: Option<String>,
    /// Type to continue from when truncated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_record_type: Option<String>,
    /// Page size the provider applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
}

/// Status of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeStatus {
    /// Accepted, not yet propagated to all name servers
    Pending,
    /// Propagated
    Insync,
}

/// Write response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Provider change id
    pub id: String,
    /// Propagation status
    pub status: ChangeStatus,
    /// When the provider accepted the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Comment echoed back from the batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Trait for hosted-zone API clients
///
/// Implementations are single-shot: one network request per call, no retry,
/// no caching, no background tasks. Whether a write is needed is decided by
/// the reconciler, never by the client.
///
/// # Errors
///
/// A request the provider answered with an error must map to
/// [`crate::Error::Service`]. Failures that never reached the provider
/// (connection, timeout) must map to [`crate::Error::Http`]. The reconciler
/// treats the two differently on writes.
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// List record sets of a zone, starting at `start_record_name`
    ///
    /// Only the first page is returned; callers filter client-side.
    ///
    /// # Parameters
    ///
    /// - `hosted_zone_id`: Bare hosted zone id
    /// - `start_record_name`: Fully-qualified name to start listing at
    async fn list_resource_record_sets(
        &self,
        hosted_zone_id: &str,
        start_record_name: &str,
    ) -> Result<ListResourceRecordSetsOutput, crate::Error>;

    /// Submit a change batch
    async fn change_resource_record_sets(
        &self,
        request: &ChangeResourceRecordSetsRequest,
    ) -> Result<ChangeInfo, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS clients from configuration
pub trait DnsClientFactory: Send + Sync {
    /// Create a DnsClient instance from configuration
    fn create(
        &self,
        config: &crate::config::ClientConfig,
    ) -> Result<Box<dyn DnsClient>, crate::Error>;
}
