// # Store Implementations
//
// Implementations of AddressStore and ReportStore. Each type implements
// both traits over a single lock, so a deleted address and its cached
// reports never disagree for long.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{Address, ReputationReport};
use crate::traits::{AddressStore, ReportStore};

/// Both halves of a configured store
#[derive(Clone)]
pub struct StoreHandles {
    pub addresses: Arc<dyn AddressStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl StoreHandles {
    /// Share one concrete store as both record store and report cache
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AddressStore + ReportStore + 'static,
    {
        Self {
            addresses: store.clone(),
            reports: store,
        }
    }
}

/// Build the store described by `config`
pub async fn open_store(config: &StoreConfig) -> Result<StoreHandles> {
    config.validate()?;

    match config {
        StoreConfig::Memory => {
            tracing::debug!("Using in-memory store");
            Ok(StoreHandles::shared(Arc::new(MemoryStore::new())))
        }
        StoreConfig::File { path } => {
            tracing::debug!(path = %path, "Using file store");
            Ok(StoreHandles::shared(Arc::new(FileStore::open(path).await?)))
        }
    }
}

/// Addresses plus the report cache, keyed the way both traits look them up
#[derive(Debug, Default, Clone)]
pub(crate) struct StoreData {
    addresses: HashMap<IpAddr, Address>,
    reports: HashMap<(String, IpAddr), ReputationReport>,
}

impl StoreData {
    /// Atomic check-and-insert
    pub(crate) fn insert_address(&mut self, address: &Address) -> Result<()> {
        if let Some(existing) = self.addresses.get(&address.ip) {
            return Err(Error::AlreadyExists {
                ip: existing.ip,
                action: existing.action,
            });
        }
        self.addresses.insert(address.ip, address.clone());
        Ok(())
    }

    pub(crate) fn address(&self, ip: IpAddr) -> Option<Address> {
        self.addresses.get(&ip).cloned()
    }

    /// Every record, oldest first
    pub(crate) fn all_addresses(&self) -> Vec<Address> {
        let mut all: Vec<Address> = self.addresses.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.ip.cmp(&b.ip)));
        all
    }

    pub(crate) fn remove_address(&mut self, ip: IpAddr) -> Option<Address> {
        self.addresses.remove(&ip)
    }

    pub(crate) fn report(&self, checker: &str, ip: IpAddr) -> Option<ReputationReport> {
        self.reports.get(&(checker.to_string(), ip)).cloned()
    }

    pub(crate) fn put_report(&mut self, checker: &str, report: &ReputationReport) -> Option<ReputationReport> {
        self.reports
            .insert((checker.to_string(), report.ip), report.clone())
    }

    pub(crate) fn remove_report(&mut self, checker: &str, ip: IpAddr) -> Option<ReputationReport> {
        self.reports.remove(&(checker.to_string(), ip))
    }

    /// Drop every checker's report for `ip`, returning what was removed
    pub(crate) fn remove_reports(&mut self, ip: IpAddr) -> Vec<(String, ReputationReport)> {
        let keys: Vec<(String, IpAddr)> = self
            .reports
            .keys()
            .filter(|(_, report_ip)| *report_ip == ip)
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|key| self.reports.remove(&key).map(|report| (key.0, report)))
            .collect()
    }

    pub(crate) fn report_entries(&self) -> impl Iterator<Item = (&str, &ReputationReport)> {
        self.reports
            .iter()
            .map(|((checker, _), report)| (checker.as_str(), report))
    }

    pub(crate) fn address_count(&self) -> usize {
        self.addresses.len()
    }
}
