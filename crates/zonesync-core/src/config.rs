//! Configuration types for zonesync
//!
//! This module defines the desired-state input and client selection
//! structures used by the binary and by library callers.

use serde::{Deserialize, Serialize};

use crate::record::{AliasTarget, Failover, RecordSpec, ZoneRef};
use crate::traits::ResourceRecordSet;

/// Which action to run for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    /// Create or update (ensure present)
    #[default]
    Create,
    /// Delete (ensure absent)
    Delete,
}

/// Full configuration for one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesyncConfig {
    /// Hosted zone id (bare or `/hostedzone/` form)
    pub zone_id: String,

    /// Action to run
    #[serde(default)]
    pub action: RecordAction,

    /// Declared record
    pub record: RecordConfig,

    /// Client selection
    pub client: ClientConfig,
}

impl ZonesyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Hosted zone id cannot be empty"));
        }

        self.record.validate()?;
        self.client.validate()?;

        Ok(())
    }

    /// Zone reference
    pub fn zone(&self) -> ZoneRef {
        ZoneRef::new(&self.zone_id)
    }
}

/// Declared record as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Record name (trailing dot optional)
    pub name: String,

    /// Record type ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Record values (value mode)
    #[serde(default)]
    pub values: Vec<String>,

    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Alias target (alias mode)
    #[serde(default)]
    pub alias_target: Option<AliasTarget>,

    /// Health check to associate
    #[serde(default)]
    pub health_check_id: Option<String>,

    /// Failover role
    #[serde(default)]
    pub failover: Option<Failover>,

    /// Set identifier
    #[serde(default)]
    pub set_identifier: Option<String>,

    /// Replace an existing, different record (UPSERT instead of CREATE)
    #[serde(default)]
    pub overwrite: bool,

    /// Use the stub client instead of the provider
    #[serde(default)]
    pub mock: bool,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            values: Vec::new(),
            ttl: None,
            alias_target: None,
            health_check_id: None,
            failover: None,
            set_identifier: None,
            overwrite: false,
            mock: false,
        }
    }

    /// Validate the record configuration
    ///
    /// Only structural checks happen here. An alias record without a set
    /// identifier is accepted and left for the provider to judge.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }
        if self.record_type.trim().is_empty() {
            return Err(crate::Error::config("Record type cannot be empty"));
        }
        if let Some(target) = &self.alias_target
            && (target.hosted_zone_id.is_empty() || target.dns_name.is_empty())
        {
            return Err(crate::Error::config(
                "Alias target requires both a hosted zone id and a DNS name",
            ));
        }
        Ok(())
    }

    /// Build the immutable spec for one invocation
    pub fn into_spec(self) -> RecordSpec {
        RecordSpec {
            name: self.name,
            record_type: self.record_type,
            ttl: self.ttl,
            values: self.values,
            alias_target: self.alias_target,
            health_check_id: self.health_check_id,
            failover: self.failover,
            set_identifier: self.set_identifier,
            overwrite: self.overwrite,
            mock: self.mock,
        }
    }
}

/// DNS client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientConfig {
    /// AWS Route 53
    Route53 {
        /// AWS region; selects the partition endpoint
        #[serde(default)]
        region: Option<String>,
        /// Explicit access key id (takes precedence over the environment)
        #[serde(default)]
        access_key_id: Option<String>,
        /// Explicit secret access key
        #[serde(default)]
        secret_access_key: Option<String>,
        /// Session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
        /// Endpoint override (tests, private endpoints)
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// In-process stub with canned record sets
    Stub {
        /// Record sets every list call returns
        #[serde(default)]
        record_sets: Vec<ResourceRecordSet>,
    },
}

impl ClientConfig {
    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ClientConfig::Route53 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id, secret_access_key) {
                (Some(_), None) | (None, Some(_)) => Err(crate::Error::config(
                    "Explicit credentials need both an access key id and a secret access key",
                )),
                _ => Ok(()),
            },
            ClientConfig::Stub { .. } => Ok(()),
        }
    }

    /// Get the client type name
    pub fn type_name(&self) -> &str {
        match self {
            ClientConfig::Route53 { .. } => "route53",
            ClientConfig::Stub { .. } => "stub",
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::Route53 {
            region: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            endpoint: None,
        }
    }
}
