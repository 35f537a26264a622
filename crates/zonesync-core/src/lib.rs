// # zonesync-core
//
// Core library for reconciling DNS records against a hosted zone.
//
// ## Architecture Overview
//
// - **RecordSpec**: Declared state of one record (value or alias mode)
// - **DnsClient**: Trait for the hosted-zone API (list + change)
// - **Reconciler**: `ensure_present` / `ensure_absent`, one read and at most
//   one write per invocation
// - **StubDnsClient**: In-process client with canned responses
// - **ClientRegistry**: Plugin-based registry for DNS clients
//
// ## Design Principles
//
// 1. **Explicit client**: The caller builds one client and passes it in; there
//    is no process-wide client
// 2. **Typed outcomes**: Provider rejections are reported, not swallowed
// 3. **Single-shot**: No retry, no caching, no persistence

pub mod config;
pub mod error;
pub mod reconciler;
pub mod record;
pub mod registry;
pub mod stub;
pub mod traits;

// Re-export core types for convenience
pub use config::{ClientConfig, RecordAction, RecordConfig, ZonesyncConfig};
pub use error::{Error, Result};
pub use reconciler::{ReconcileOutcome, ensure_absent, ensure_present};
pub use record::{AliasTarget, Failover, RecordSet, RecordSpec, ZoneRef};
pub use registry::ClientRegistry;
pub use stub::StubDnsClient;
pub use traits::DnsClient;
