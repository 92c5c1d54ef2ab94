//! Backend registries
//!
//! Endpoints, checkers and alerters are collected into explicit registry
//! objects built once at startup and handed to the
//! [`BlocklistService`](crate::BlocklistService). There is no process-wide
//! state: tests build their own registries with fakes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hbl_core::registry::EndpointRegistry;
//!
//! let endpoints = EndpointRegistry::new();
//! endpoints.register(Arc::new(powerdns_endpoint));
//! endpoints.register(Arc::new(cloudflare_endpoint));
//!
//! // Fail-fast fan-out
//! endpoints.execute_on_all(EndpointAction::Block, ip).await?;
//! ```
//!
//! ## Registration
//!
//! The first registration for a name wins. A second backend with the same
//! name is ignored and logged, so a double registration can never swap a
//! backend out from under a running service.
//!
//! Registration takes a write lock; lookups clone a snapshot of the
//! registered handles, so no lock is held while a backend call is awaited.

mod alerters;
mod checkers;
mod endpoints;
mod factory;

pub use alerters::AlerterRegistry;
pub use checkers::CheckerRegistry;
pub use endpoints::EndpointRegistry;
pub use factory::FactoryRegistry;

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default upper bound for a single backend call
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Write-once-per-name collection of backends, in registration order
pub(crate) struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: RwLock<Vec<(String, Arc<T>)>>,
}

impl<T: ?Sized> Registry<T> {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert `item` under `name` unless the name is taken
    pub(crate) fn register(&self, name: &str, item: Arc<T>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.iter().any(|(existing, _)| existing == name) {
            tracing::warn!(
                kind = self.kind,
                name = name,
                "Ignoring duplicate registration, first registration wins"
            );
            return false;
        }

        tracing::debug!(kind = self.kind, name = name, "Registered backend");
        entries.push((name.to_string(), item));
        true
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, item)| Arc::clone(item))
    }

    pub(crate) fn get_or_err(&self, name: &str) -> Result<Arc<T>> {
        self.get(name)
            .ok_or_else(|| Error::not_registered(self.kind, name))
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(_, item)| Arc::clone(item)).collect()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Run a backend call under a deadline, attributing expiry to `backend`
pub(crate) async fn bounded<T, F>(backend: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(backend)),
    }
}
