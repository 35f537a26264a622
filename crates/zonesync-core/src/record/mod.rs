//! Record specifications and comparison shapes
//!
//! A [`RecordSpec`] is the declared state of one record. The reconciler
//! narrows both the declaration and the live provider record into a
//! [`RecordSet`] and compares those.
//!
//! ## Modes
//!
//! - **Value mode**: the record holds literal values. Compared on name, type,
//!   TTL and the sorted value list.
//! - **Alias mode**: the record points at another provider resource. Compared
//!   on name, type, set identifier, failover role and alias target. TTL and
//!   values do not take part.
//!
//! A spec is in alias mode whenever it carries an alias target.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::traits::{ResourceRecord, ResourceRecordSet};

/// Path prefix the provider puts in front of hosted zone ids
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// Target of an alias record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasTarget {
    /// Hosted zone of the target resource
    pub hosted_zone_id: String,
    /// DNS name of the target resource
    pub dns_name: String,
    /// Whether the provider evaluates the target's health
    #[serde(default)]
    pub evaluate_target_health: bool,
}

/// Failover routing role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Failover {
    /// Serves traffic while healthy
    Primary,
    /// Serves traffic when the primary is unhealthy
    Secondary,
}

impl Failover {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Failover::Primary => "PRIMARY",
            Failover::Secondary => "SECONDARY",
        }
    }
}

impl fmt::Display for Failover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Failover {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(Failover::Primary),
            "SECONDARY" => Ok(Failover::Secondary),
            other => Err(Error::invalid_input(format!(
                "Unknown failover role '{}'. Valid roles: PRIMARY, SECONDARY",
                other
            ))),
        }
    }
}

/// Append a trailing dot to `name` unless it already has one
pub fn normalize_name(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Reference to a hosted zone
///
/// Accepts both the bare id (`Z0123456789`) and the path form
/// (`/hostedzone/Z0123456789`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneRef(String);

impl ZoneRef {
    /// Create a zone reference
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref().trim();
        let bare = id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(id);
        Self(bare.to_string())
    }

    /// Bare zone id
    pub fn id(&self) -> &str {
        &self.0
    }

    /// `/hostedzone/<id>` form, as the provider reports it
    pub fn path(&self) -> String {
        format!("{}{}", HOSTED_ZONE_PREFIX, self.0)
    }
}

impl fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared state of one record
///
/// Built once per invocation; the reconciler never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    /// Record name; see [`RecordSpec::normalized_name`]
    pub name: String,
    /// Record type ("A", "AAAA", "CNAME", "MX", "TXT", ...)
    pub record_type: String,
    /// Time-to-live in seconds (value mode)
    pub ttl: Option<u32>,
    /// Record values in any order (value mode)
    pub values: Vec<String>,
    /// Alias target; its presence selects alias mode
    pub alias_target: Option<AliasTarget>,
    /// Health check to associate with the record on writes
    pub health_check_id: Option<String>,
    /// Failover role (alias mode)
    pub failover: Option<Failover>,
    /// Set identifier (alias mode)
    pub set_identifier: Option<String>,
    /// Use UPSERT instead of CREATE when the record differs
    pub overwrite: bool,
    /// Run against the stub client
    pub mock: bool,
}

impl RecordSpec {
    /// Create a value-mode spec with no values
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl: None,
            values: Vec::new(),
            alias_target: None,
            health_check_id: None,
            failover: None,
            set_identifier: None,
            overwrite: false,
            mock: false,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the values
    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Set the alias target (switches to alias mode)
    pub fn with_alias_target(mut self, target: AliasTarget) -> Self {
        self.alias_target = Some(target);
        self
    }

    /// Set the health check id
    pub fn with_health_check_id(mut self, id: impl Into<String>) -> Self {
        self.health_check_id = Some(id.into());
        self
    }

    /// Set the failover role
    pub fn with_failover(mut self, failover: Failover) -> Self {
        self.failover = Some(failover);
        self
    }

    /// Set the set identifier
    pub fn with_set_identifier(mut self, id: impl Into<String>) -> Self {
        self.set_identifier = Some(id.into());
        self
    }

    /// Enable or disable overwrite (UPSERT)
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Enable or disable mock mode
    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    /// Name in trailing-dot form
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether this spec is compared in alias mode
    pub fn is_alias(&self) -> bool {
        self.alias_target.is_some()
    }

    /// Desired comparison shape
    pub fn desired_record_set(&self) -> RecordSet {
        let name = self.normalized_name();
        match &self.alias_target {
            Some(target) => RecordSet::Alias(AliasRecordSet {
                name,
                record_type: self.record_type.clone(),
                set_identifier: self.set_identifier.clone(),
                failover: self.failover,
                alias_target: target.clone(),
            }),
            None => RecordSet::Value(ValueRecordSet::new(
                name,
                self.record_type.clone(),
                self.ttl,
                self.values.iter().cloned(),
            )),
        }
    }
}

/// Value-mode comparison shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecordSet {
    /// Trailing-dot name
    pub name: String,
    /// Record type
    pub record_type: String,
    /// Time-to-live
    pub ttl: Option<u32>,
    /// Values, sorted
    pub resource_records: Vec<ResourceRecord>,
}

impl ValueRecordSet {
    /// Create a value-mode shape; `values` are sorted
    pub fn new<I>(name: String, record_type: String, ttl: Option<u32>, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut values: Vec<String> = values.into_iter().collect();
        values.sort();
        Self {
            name,
            record_type,
            ttl,
            resource_records: values.into_iter().map(ResourceRecord::new).collect(),
        }
    }
}

/// Alias-mode comparison shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecordSet {
    /// Trailing-dot name
    pub name: String,
    /// Record type
    pub record_type: String,
    /// Set identifier
    pub set_identifier: Option<String>,
    /// Failover role
    pub failover: Option<Failover>,
    /// Alias target
    pub alias_target: AliasTarget,
}

/// A record set narrowed to the fields the reconciler compares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RecordSet {
    /// Literal values
    Value(ValueRecordSet),
    /// Pointer to another provider resource
    Alias(AliasRecordSet),
}

impl RecordSet {
    /// Narrow a live record set to the value-mode shape
    pub fn value_from(live: &ResourceRecordSet) -> Self {
        RecordSet::Value(ValueRecordSet::new(
            live.name.clone(),
            live.record_type.clone(),
            live.ttl,
            live.resource_records.iter().map(|r| r.value.clone()),
        ))
    }

    /// Narrow a live record set to the alias-mode shape
    ///
    /// Returns `None` if the live record has no alias target.
    pub fn alias_from(live: &ResourceRecordSet) -> Option<Self> {
        let target = live.alias_target.clone()?;
        Some(RecordSet::Alias(AliasRecordSet {
            name: live.name.clone(),
            record_type: live.record_type.clone(),
            set_identifier: live.set_identifier.clone(),
            failover: live.failover,
            alias_target: target,
        }))
    }

    /// Record name
    pub fn name(&self) -> &str {
        match self {
            RecordSet::Value(set) => &set.name,
            RecordSet::Alias(set) => &set.name,
        }
    }

    /// Expand into the provider shape, attaching `health_check_id`
    pub fn to_resource_record_set(&self, health_check_id: Option<&str>) -> ResourceRecordSet {
        let health_check_id = health_check_id.map(str::to_string);
        match self {
            RecordSet::Value(set) => ResourceRecordSet {
                name: set.name.clone(),
                record_type: set.record_type.clone(),
                ttl: set.ttl,
                resource_records: set.resource_records.clone(),
                health_check_id,
                ..Default::default()
            },
            RecordSet::Alias(set) => ResourceRecordSet {
                name: set.name.clone(),
                record_type: set.record_type.clone(),
                alias_target: Some(set.alias_target.clone()),
                set_identifier: set.set_identifier.clone(),
                failover: set.failover,
                health_check_id,
                ..Default::default()
            },
        }
    }
}
