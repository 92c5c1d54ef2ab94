// # Endpoint Trait
//
// Defines the interface for enforcement backends.
//
// ## Implementations
//
// - Cloudflare: `hbl-endpoint-cloudflare` crate (account access rules)
// - PowerDNS: `hbl-endpoint-pdns` crate (RBL zone records)
//
// ## Usage
//
// ```rust,ignore
// use hbl_core::Endpoint;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let endpoint = /* Endpoint implementation */;
//     let ip = "203.0.113.5".parse()?;
//
//     endpoint.block(ip).await?;
//     assert!(endpoint.exists(ip).await?);
//
//     // Heals "should exist but doesn't", never removes anything
//     endpoint.sync(ip).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for enforcement backend implementations
///
/// Each endpoint owns the durable representation of a block on its own
/// backend (an ACL rule, a DNS record) and is solely responsible for
/// translating block/unblock into it.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - `block` and `unblock` are idempotent and independent of the order in
///   which endpoints are visited.
/// - `unblock` on an address without an artifact succeeds.
/// - Errors are returned as-is. The registry tags them with [`Endpoint::name`]
///   and the orchestrator never retries; convergence comes from later syncs.
/// - Cancellation happens by dropping the future. Whatever the backend
///   already applied stays applied.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Stable unique name, used as registry key and in error attribution
    fn name(&self) -> &str;

    /// Create or replace the enforcement artifact for `ip`
    async fn block(&self, ip: IpAddr) -> Result<(), crate::Error>;

    /// Remove the enforcement artifact for `ip`
    ///
    /// Succeeds when no artifact exists.
    async fn unblock(&self, ip: IpAddr) -> Result<(), crate::Error>;

    /// Check whether an artifact for `ip` is currently present
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: artifact present
    /// - `Ok(false)`: artifact absent
    /// - `Err(Error)`: the backend could not be queried
    async fn exists(&self, ip: IpAddr) -> Result<bool, crate::Error>;

    /// Reconcile `ip` on this backend
    ///
    /// Blocks when the artifact is missing and does nothing otherwise. Sync
    /// never removes an artifact.
    async fn sync(&self, ip: IpAddr) -> Result<(), crate::Error> {
        if self.exists(ip).await? {
            tracing::debug!(endpoint = self.name(), ip = %ip, "Artifact present, nothing to sync");
            return Ok(());
        }

        tracing::info!(endpoint = self.name(), ip = %ip, "Artifact missing, re-applying block");
        self.block(ip).await
    }
}

/// Helper trait for constructing endpoints from configuration
pub trait EndpointFactory: Send + Sync {
    /// Create an Endpoint instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this endpoint
    /// - `dry_run`: Perform reads but skip mutating calls
    fn create(
        &self,
        config: &crate::config::EndpointConfig,
        dry_run: bool,
    ) -> Result<std::sync::Arc<dyn Endpoint>, crate::Error>;
}
