//! Plugin-based client registry
//!
//! The registry allows DNS clients to be registered at runtime, so the
//! binary selects a provider from configuration instead of an if-else chain.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonesync_core::ClientRegistry;
//! use zonesync_core::config::ClientConfig;
//!
//! let registry = ClientRegistry::new();
//! zonesync_core::stub::register(&registry);
//! zonesync_provider_route53::register(&registry);
//!
//! // Build the one client this invocation uses
//! let client = registry.create_client(&ClientConfig::default())?;
//! ```

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsClient, DnsClientFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of DNS client factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ClientRegistry {
    /// Registered DNS client factories
    clients: RwLock<HashMap<String, Box<dyn DnsClientFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS client factory
    ///
    /// # Parameters
    ///
    /// - `name`: Client type name (e.g., "route53", "stub")
    /// - `factory`: Factory object for creating client instances
    pub fn register_client(&self, name: impl Into<String>, factory: Box<dyn DnsClientFactory>) {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        clients.insert(name.into(), factory);
    }

    /// Create a DNS client from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsClient>)`: Created client instance
    /// - `Err(Error)`: If the client type is not registered or creation fails
    pub fn create_client(&self, config: &ClientConfig) -> Result<Box<dyn DnsClient>> {
        config.validate()?;

        let client_type = config.type_name();
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);

        let factory = clients
            .get(client_type)
            .ok_or_else(|| Error::config(format!("Unknown client type: {}", client_type)))?;

        factory.create(config)
    }

    /// List all registered client types
    pub fn list_clients(&self) -> Vec<String> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.keys().cloned().collect()
    }

    /// Check if a client type is registered
    pub fn has_client(&self, name: &str) -> bool {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        clients.contains_key(name)
    }
}
