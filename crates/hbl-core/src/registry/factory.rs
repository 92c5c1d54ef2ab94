//! Plugin-based backend factories
//!
//! Backend crates register a factory under a type name during
//! initialization, and the binary builds configured backends from
//! [`crate::HblConfig`] without hardcoded if-else chains.
//!
//! ```rust,ignore
//! // In hbl-endpoint-pdns
//! pub fn register(registry: &FactoryRegistry) {
//!     registry.register_endpoint_factory("powerdns", Box::new(PowerDnsFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{AlerterConfig, CheckerConfig, EndpointConfig};
use crate::error::{Error, Result};
use crate::traits::{Alerter, AlerterFactory, Endpoint, EndpointFactory};
use crate::traits::{ReputationSource, SourceFactory};

/// Map of backend type names to factory objects
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent reads, exclusive writes.
#[derive(Default)]
pub struct FactoryRegistry {
    endpoints: RwLock<HashMap<String, Box<dyn EndpointFactory>>>,
    sources: RwLock<HashMap<String, Box<dyn SourceFactory>>>,
    alerters: RwLock<HashMap<String, Box<dyn AlerterFactory>>>,
}

impl FactoryRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint factory
    ///
    /// # Parameters
    ///
    /// - `name`: Endpoint type name (e.g., "cloudflare", "powerdns")
    /// - `factory`: Factory object for creating endpoint instances
    pub fn register_endpoint_factory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn EndpointFactory>,
    ) {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        endpoints.insert(name.into(), factory);
    }

    /// Register a reputation source factory (e.g., "abuseipdb")
    pub fn register_source_factory(&self, name: impl Into<String>, factory: Box<dyn SourceFactory>) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register an alerter factory (e.g., "slack")
    pub fn register_alerter_factory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AlerterFactory>,
    ) {
        let mut alerters = self.alerters.write().unwrap_or_else(PoisonError::into_inner);
        alerters.insert(name.into(), factory);
    }

    /// Create an endpoint from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Endpoint>)`: Created endpoint instance
    /// - `Err(Error)`: If the endpoint type is not registered or creation fails
    pub fn create_endpoint(&self, config: &EndpointConfig, dry_run: bool) -> Result<Arc<dyn Endpoint>> {
        let endpoint_type = config.type_name();
        let endpoints = self.endpoints.read().unwrap_or_else(PoisonError::into_inner);

        let factory = endpoints
            .get(endpoint_type)
            .ok_or_else(|| Error::config(format!("Unknown endpoint type: {}", endpoint_type)))?;

        factory.create(config, dry_run)
    }

    /// Create a reputation source from checker configuration
    pub fn create_source(&self, config: &CheckerConfig) -> Result<Arc<dyn ReputationSource>> {
        let checker_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(checker_type)
            .ok_or_else(|| Error::config(format!("Unknown checker type: {}", checker_type)))?;

        factory.create(config)
    }

    /// Create an alerter from configuration
    pub fn create_alerter(&self, config: &AlerterConfig) -> Result<Arc<dyn Alerter>> {
        let alerter_type = config.type_name();
        let alerters = self.alerters.read().unwrap_or_else(PoisonError::into_inner);

        let factory = alerters
            .get(alerter_type)
            .ok_or_else(|| Error::config(format!("Unknown alerter type: {}", alerter_type)))?;

        factory.create(config)
    }

    /// List all registered endpoint types
    pub fn list_endpoint_factories(&self) -> Vec<String> {
        sorted_keys(&self.endpoints)
    }

    /// List all registered checker types
    pub fn list_source_factories(&self) -> Vec<String> {
        sorted_keys(&self.sources)
    }

    /// List all registered alerter types
    pub fn list_alerter_factories(&self) -> Vec<String> {
        sorted_keys(&self.alerters)
    }

    /// Check if an endpoint type is registered
    pub fn has_endpoint_factory(&self, name: &str) -> bool {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if a checker type is registered
    pub fn has_source_factory(&self, name: &str) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Check if an alerter type is registered
    pub fn has_alerter_factory(&self, name: &str) -> bool {
        self.alerters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

fn sorted_keys<V>(map: &RwLock<HashMap<String, V>>) -> Vec<String> {
    let map = map.read().unwrap_or_else(PoisonError::into_inner);
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
