// # Memory Store
//
// In-memory implementation of AddressStore and ReportStore.
//
// Nothing survives a restart. Useful for tests, for embedding, and for
// dry runs where the record set is rebuilt on every start.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::StoreData;
use crate::Error;
use crate::model::{Address, ReputationReport};
use crate::traits::{AddressStore, ReportStore};

/// In-memory store
///
/// # Example
///
/// ```rust,no_run
/// use hbl_core::{AddressStore, MemoryStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let ip = "203.0.113.5".parse()?;
///
///     assert!(store.get(ip).await?.is_none());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreData>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of address records
    pub async fn len(&self) -> usize {
        self.inner.read().await.address_count()
    }

    /// Whether the store holds no address records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn create(&self, address: &Address) -> Result<(), Error> {
        self.inner.write().await.insert_address(address)
    }

    async fn get(&self, ip: IpAddr) -> Result<Option<Address>, Error> {
        Ok(self.inner.read().await.address(ip))
    }

    async fn get_all(&self) -> Result<Vec<Address>, Error> {
        Ok(self.inner.read().await.all_addresses())
    }

    async fn delete(&self, ip: IpAddr) -> Result<(), Error> {
        self.inner.write().await.remove_address(ip);
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get(&self, checker: &str, ip: IpAddr) -> Result<Option<ReputationReport>, Error> {
        Ok(self.inner.read().await.report(checker, ip))
    }

    async fn put(&self, checker: &str, report: &ReputationReport) -> Result<(), Error> {
        self.inner.write().await.put_report(checker, report);
        Ok(())
    }

    async fn delete(&self, ip: IpAddr) -> Result<(), Error> {
        self.inner.write().await.remove_reports(ip);
        Ok(())
    }
}
