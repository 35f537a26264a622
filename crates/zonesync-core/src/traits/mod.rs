//! Core traits for zonesync
//!
//! - [`DnsClient`]: List and change record sets of a hosted zone
//! - [`DnsClientFactory`]: Build a client from configuration

pub mod dns_client;

pub use dns_client::{
    Change, ChangeAction, ChangeBatch, ChangeInfo, ChangeResourceRecordSetsRequest, ChangeStatus,
    DnsClient, DnsClientFactory, ListResourceRecordSetsOutput, ResourceRecord, ResourceRecordSet,
};
