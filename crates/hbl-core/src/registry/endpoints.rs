use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{DEFAULT_BACKEND_TIMEOUT, Registry, bounded};
use crate::error::{Error, Result};
use crate::model::EndpointAction;
use crate::traits::Endpoint;

/// Registry of enforcement endpoints
///
/// # Fan-out
///
/// [`EndpointRegistry::execute_on_all`] is fail-fast, not best-effort: the
/// first endpoint error stops the iteration and is returned tagged with the
/// endpoint's name. Endpoints visited before the failure keep whatever they
/// applied. Nothing is rolled back; the address store stays the source of
/// truth and a later sync carries the remaining endpoints forward.
pub struct EndpointRegistry {
    inner: Registry<dyn Endpoint>,
    timeout: Duration,
}

impl EndpointRegistry {
    /// Create an empty registry with the default per-call timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_BACKEND_TIMEOUT)
    }

    /// Create an empty registry with a custom per-call timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Registry::new("endpoint"),
            timeout,
        }
    }

    /// Register an endpoint under its own name
    ///
    /// Returns `false` (and keeps the existing endpoint) if the name is taken.
    pub fn register(&self, endpoint: Arc<dyn Endpoint>) -> bool {
        let name = endpoint.name().to_string();
        self.inner.register(&name, endpoint)
    }

    /// Look up an endpoint by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Endpoint>> {
        self.inner.get(name)
    }

    /// Names of all registered endpoints, in registration order
    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no endpoint is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an endpoint name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.inner.get(name).is_some()
    }

    /// Apply `action` to every endpoint, stopping at the first failure
    pub async fn execute_on_all(&self, action: EndpointAction, ip: IpAddr) -> Result<()> {
        for endpoint in self.inner.snapshot() {
            if let Err(e) = self.apply(endpoint.as_ref(), action, ip).await {
                warn!(
                    endpoint = endpoint.name(),
                    ip = %ip,
                    action = %action,
                    "Fan-out stopped at failing endpoint: {}",
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Apply `action` to one named endpoint
    pub async fn execute_on_one(
        &self,
        name: &str,
        action: EndpointAction,
        ip: IpAddr,
    ) -> Result<()> {
        let endpoint = self.inner.get_or_err(name)?;
        self.apply(endpoint.as_ref(), action, ip).await
    }

    async fn apply(&self, endpoint: &dyn Endpoint, action: EndpointAction, ip: IpAddr) -> Result<()> {
        let name = endpoint.name();
        debug!(endpoint = name, ip = %ip, action = %action, "Applying action");

        let call = async {
            match action {
                EndpointAction::Block => endpoint.block(ip).await,
                EndpointAction::Unblock => endpoint.unblock(ip).await,
                EndpointAction::Sync => endpoint.sync(ip).await,
            }
        };

        bounded(name, self.timeout, call).await.map_err(|e| match e {
            Error::Timeout { .. } => e,
            other => Error::endpoint(name, action.as_str(), other),
        })
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
