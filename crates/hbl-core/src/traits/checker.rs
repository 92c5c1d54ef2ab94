// # Checker Trait
//
// Defines the interface for reputation lookups.
//
// A checker answers "what is known about this address" from a local cache,
// falling back to a remote reputation API on a miss. The cache-or-fetch
// policy is implemented once by `CachingChecker`; plugin crates only supply
// the remote half as a `ReputationSource`.
//
// ## Implementations
//
// - AbuseIPDB: `hbl-checker-abuseipdb` crate

use async_trait::async_trait;
use std::net::IpAddr;

use crate::model::ReputationReport;

/// Trait for reputation checkers
#[async_trait]
pub trait Checker: Send + Sync {
    /// Stable unique name (e.g. "AbuseIPDB")
    fn name(&self) -> &str;

    /// Return a cached or freshly fetched report for `ip`
    async fn check(&self, ip: IpAddr) -> Result<ReputationReport, crate::Error>;
}

/// Remote reputation API
///
/// Sources are single-shot: one request per call, no caching, no retries.
#[async_trait]
pub trait ReputationSource: Send + Sync {
    /// Name under which reports are cached
    fn name(&self) -> &str;

    /// Fetch a fresh report from the remote API
    async fn fetch(&self, ip: IpAddr) -> Result<ReputationReport, crate::Error>;
}

/// Helper trait for constructing reputation sources from configuration
pub trait SourceFactory: Send + Sync {
    /// Create a ReputationSource instance from configuration
    fn create(
        &self,
        config: &crate::config::CheckerConfig,
    ) -> Result<std::sync::Arc<dyn ReputationSource>, crate::Error>;
}
