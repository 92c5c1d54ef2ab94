// # Store Traits
//
// Defines the interfaces for the authoritative record store and the
// reputation report cache.
//
// ## Purpose
//
// The address store is the single source of truth: endpoint state is
// reconciled against it, never the other way around. The report store
// caches checker results keyed by (checker name, address).
//
// ## Implementations
//
// - `MemoryStore`: non-persistent, for tests and embedding
// - `FileStore`: JSON document with atomic writes and backup recovery
//
// ## Usage
//
// ```rust
// use hbl_core::{AddressStore, MemoryStore};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = MemoryStore::new();
//     let ip = "203.0.113.5".parse()?;
//
//     assert!(store.get(ip).await?.is_none());
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::model::{Address, ReputationReport};

/// Trait for the authoritative address record store
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Uniqueness
///
/// `create` must be an atomic check-and-insert. Two concurrent creates for
/// the same address must leave exactly one record and fail the other with
/// [`crate::Error::AlreadyExists`].
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Record stored
    /// - `Err(Error::AlreadyExists)`: A record for the address exists
    /// - `Err(Error)`: Storage error
    async fn create(&self, address: &Address) -> Result<(), crate::Error>;

    /// Get the record for an address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Address))`: The record
    /// - `Ok(None)`: No record for this address
    /// - `Err(Error)`: Storage error
    async fn get(&self, ip: IpAddr) -> Result<Option<Address>, crate::Error>;

    /// List every record
    async fn get_all(&self) -> Result<Vec<Address>, crate::Error>;

    /// Delete the record for an address
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Deleted (or didn't exist)
    /// - `Err(Error)`: Storage error
    async fn delete(&self, ip: IpAddr) -> Result<(), crate::Error>;
}

/// Trait for the reputation report cache
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Get the cached report a checker produced for an address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(report))`: Cache hit
    /// - `Ok(None)`: Cache miss
    /// - `Err(Error)`: Storage error (must not be treated as a miss)
    async fn get(
        &self,
        checker: &str,
        ip: IpAddr,
    ) -> Result<Option<ReputationReport>, crate::Error>;

    /// Store a report, fully replacing any previous one for (checker, ip)
    async fn put(&self, checker: &str, report: &ReputationReport) -> Result<(), crate::Error>;

    /// Delete every checker's report for an address
    async fn delete(&self, ip: IpAddr) -> Result<(), crate::Error>;
}
