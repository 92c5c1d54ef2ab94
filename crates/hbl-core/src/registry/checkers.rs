use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use super::{DEFAULT_BACKEND_TIMEOUT, Registry, bounded};
use crate::error::Result;
use crate::model::ReputationReport;
use crate::traits::Checker;

/// Registry of reputation checkers, keyed by checker name
pub struct CheckerRegistry {
    inner: Registry<dyn Checker>,
    timeout: Duration,
}

impl CheckerRegistry {
    /// Create an empty registry with the default per-call timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_BACKEND_TIMEOUT)
    }

    /// Create an empty registry with a custom per-call timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Registry::new("checker"),
            timeout,
        }
    }

    /// Register a checker under its own name; first registration wins
    pub fn register(&self, checker: Arc<dyn Checker>) -> bool {
        let name = checker.name().to_string();
        self.inner.register(&name, checker)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Checker>> {
        self.inner.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.names()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.get(name).is_some()
    }

    /// Run the named checker against `ip`
    ///
    /// Unknown names fail with [`crate::Error::NotRegistered`].
    pub async fn check(&self, name: &str, ip: IpAddr) -> Result<ReputationReport> {
        let checker = self.inner.get_or_err(name)?;
        tracing::debug!(checker = name, ip = %ip, "Running reputation check");
        bounded(name, self.timeout, checker.check(ip)).await
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
