//! Block-list orchestration service
//!
//! The [`BlocklistService`] owns the lifecycle of address records and keeps
//! every registered endpoint converged on them.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────┐
//!  block/allow ──▶│ BlocklistService │
//!  delete/sync    └──────────────────┘
//!                          │
//!      ┌───────────────────┼────────────────────┬─────────────────┐
//!      ▼                   ▼                    ▼                 ▼
//! ┌─────────────┐  ┌──────────────────┐  ┌──────────────┐  ┌─────────────┐
//! │AddressStore │  │ EndpointRegistry │  │CheckerRegistry│  │  Alerters   │
//! │ (truth)     │  │ (fail-fast)      │  │(cache-or-fetch)│ │(best-effort)│
//! └─────────────┘  └──────────────────┘  └──────────────┘  └─────────────┘
//! ```
//!
//! ## Ordering
//!
//! Within one call: store write, then endpoint calls, then alerts. A store
//! failure stops the call before any endpoint is touched. An endpoint
//! failure leaves the record in place for a later sync to heal.
//!
//! ## States
//!
//! Per address: `Absent`, `Allowed`, `Blocked`. Records are never mutated;
//! changing an action means delete then create.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::HblConfig;
use crate::error::{Error, Result};
use crate::model::{Action, Address, Alert, EndpointAction, NewAddress, ReputationReport};
use crate::registry::{AlerterRegistry, CheckerRegistry, EndpointRegistry, FactoryRegistry};
use crate::reputation::CachingChecker;
use crate::store::{StoreHandles, open_store};
use crate::traits::{AddressStore, ReportStore};

/// Outcome of a full reconciliation pass
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Blocked addresses that every endpoint now holds
    pub synced: Vec<IpAddr>,
    /// Allowed addresses, which have nothing to sync
    pub skipped: Vec<IpAddr>,
    /// Addresses whose sync failed, with the first endpoint error
    pub failed: Vec<(IpAddr, Error)>,
}

impl SyncSummary {
    /// Whether every blocked address converged
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of records visited
    pub fn total(&self) -> usize {
        self.synced.len() + self.skipped.len() + self.failed.len()
    }
}

/// Orchestrates records, endpoints, checkers and alerters
///
/// All methods take `&self`; share the service through an `Arc`. Dropping a
/// returned future cancels the in-flight backend call. Changes an endpoint
/// already applied are not rolled back.
pub struct BlocklistService {
    addresses: Arc<dyn AddressStore>,
    reports: Arc<dyn ReportStore>,
    endpoints: EndpointRegistry,
    checkers: CheckerRegistry,
    alerters: AlerterRegistry,
}

impl BlocklistService {
    /// Create a service from explicit parts
    pub fn new(
        stores: StoreHandles,
        endpoints: EndpointRegistry,
        checkers: CheckerRegistry,
        alerters: AlerterRegistry,
    ) -> Self {
        Self {
            addresses: stores.addresses,
            reports: stores.reports,
            endpoints,
            checkers,
            alerters,
        }
    }

    /// Build the store and every configured backend
    ///
    /// Checkers are built from their sources and fronted by the store's
    /// report cache.
    pub async fn from_config(config: &HblConfig, factories: &FactoryRegistry) -> Result<Self> {
        config.validate()?;

        let stores = open_store(&config.store).await?;
        let timeout = config.service.backend_timeout();
        let dry_run = config.service.dry_run;

        if dry_run {
            warn!("Dry-run mode: endpoints will not be modified");
        }

        let endpoints = EndpointRegistry::with_timeout(timeout);
        for endpoint_config in &config.endpoints {
            endpoints.register(factories.create_endpoint(endpoint_config, dry_run)?);
        }

        let checkers = CheckerRegistry::with_timeout(timeout);
        for checker_config in &config.checkers {
            let source = factories.create_source(checker_config)?;
            checkers.register(Arc::new(CachingChecker::new(
                source,
                Arc::clone(&stores.reports),
                config.service.report_ttl(),
            )));
        }

        let alerters = AlerterRegistry::with_timeout(timeout);
        for alerter_config in &config.alerters {
            alerters.register(factories.create_alerter(alerter_config)?);
        }

        info!(
            endpoints = endpoints.len(),
            checkers = checkers.len(),
            alerters = alerters.len(),
            "Block-list service ready"
        );

        Ok(Self::new(stores, endpoints, checkers, alerters))
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn checkers(&self) -> &CheckerRegistry {
        &self.checkers
    }

    pub fn alerters(&self) -> &AlerterRegistry {
        &self.alerters
    }

    /// Record a block and enforce it on every endpoint
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the address has a record (nothing is changed)
    /// - store errors, before any endpoint is called
    /// - `Endpoint`/`Timeout` naming the first failing endpoint; the record
    ///   stays Blocked and no alert is sent
    pub async fn block(&self, request: NewAddress) -> Result<Address> {
        let record = self.create_record(request, Action::Block).await?;

        self.endpoints
            .execute_on_all(EndpointAction::Block, record.ip)
            .await
            .inspect_err(|e| {
                warn!(ip = %record.ip, "Block recorded but not enforced everywhere: {}", e);
            })?;

        info!(ip = %record.ip, author = %record.author, "Address blocked");
        self.alerters.alert_on_all(&Alert::for_record(&record)).await;
        Ok(record)
    }

    /// Record an allow-list entry
    ///
    /// Allowed addresses are never pushed to endpoints.
    pub async fn allow(&self, request: NewAddress) -> Result<Address> {
        let record = self.create_record(request, Action::Allow).await?;

        info!(ip = %record.ip, author = %record.author, "Address allowed");
        self.alerters.alert_on_all(&Alert::for_record(&record)).await;
        Ok(record)
    }

    /// Remove a record, lifting the block first when there is one
    ///
    /// The record and its cached reports are deleted even when unblocking
    /// fails; the unblock error is returned afterwards and takes precedence
    /// over a report-cache failure, which is then only logged.
    pub async fn delete(&self, ip: IpAddr) -> Result<()> {
        let record = self.get_one(ip).await?;

        let unblocked = if record.is_blocked() {
            self.endpoints.execute_on_all(EndpointAction::Unblock, ip).await
        } else {
            Ok(())
        };

        self.addresses.delete(ip).await?;
        let purged = self.reports.delete(ip).await;

        if let Err(e) = unblocked {
            if let Err(cache_err) = &purged {
                warn!(ip = %ip, "Failed to drop cached reports: {}", cache_err);
            }
            warn!(ip = %ip, "Record deleted but some endpoints may still block it: {}", e);
            return Err(e);
        }
        purged?;

        info!(ip = %ip, action = %record.action, "Address deleted");
        if record.is_blocked() {
            self.alerters.alert_on_all(&Alert::for_unblock(&record)).await;
        }
        Ok(())
    }

    /// Get the record for `ip`
    pub async fn get_one(&self, ip: IpAddr) -> Result<Address> {
        self.addresses
            .get(ip)
            .await?
            .ok_or_else(|| Error::not_found(format!("Address {} not found", ip)))
    }

    /// List every record
    pub async fn get_all(&self) -> Result<Vec<Address>> {
        self.addresses.get_all().await
    }

    /// Re-apply a block on every endpoint that lost it
    ///
    /// Allowed records have no artifacts and sync to a no-op.
    pub async fn sync_one(&self, ip: IpAddr) -> Result<()> {
        let record = self.get_one(ip).await?;
        if !record.is_blocked() {
            debug!(ip = %ip, "Allowed address, nothing to sync");
            return Ok(());
        }

        self.endpoints
            .execute_on_all(EndpointAction::Sync, ip)
            .await?;
        debug!(ip = %ip, "Address in sync");
        Ok(())
    }

    /// Reconcile every record
    ///
    /// A failure on one address does not stop the pass. Failing to list the
    /// records is an error.
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let records = self.addresses.get_all().await?;
        let mut summary = SyncSummary::default();

        for record in records {
            if !record.is_blocked() {
                summary.skipped.push(record.ip);
                continue;
            }

            match self
                .endpoints
                .execute_on_all(EndpointAction::Sync, record.ip)
                .await
            {
                Ok(()) => summary.synced.push(record.ip),
                Err(e) => {
                    warn!(ip = %record.ip, "Sync failed: {}", e);
                    summary.failed.push((record.ip, e));
                }
            }
        }

        info!(
            synced = summary.synced.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "Sync pass finished"
        );
        Ok(summary)
    }

    /// Run a named checker against `ip`
    pub async fn check(&self, checker: &str, ip: IpAddr) -> Result<ReputationReport> {
        self.checkers.check(checker, ip).await
    }

    async fn create_record(&self, request: NewAddress, action: Action) -> Result<Address> {
        if let Some(existing) = self.addresses.get(request.ip()).await? {
            return Err(Error::AlreadyExists {
                ip: existing.ip,
                action: existing.action,
            });
        }

        let record = request.into_record(action);
        self.addresses.create(&record).await?;
        debug!(ip = %record.ip, action = %action, "Record stored");
        Ok(record)
    }
}
