//! Cache-or-fetch reputation checking
//!
//! [`CachingChecker`] fronts a remote [`ReputationSource`] with the
//! [`ReportStore`]: a cached report is returned verbatim, a miss (or a stale
//! entry when a TTL is configured) is fetched once and persisted.

use async_trait::async_trait;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::ReputationReport;
use crate::traits::{Checker, ReportStore, ReputationSource};

/// A [`Checker`] backed by a report cache
pub struct CachingChecker {
    source: Arc<dyn ReputationSource>,
    store: Arc<dyn ReportStore>,
    ttl: Option<Duration>,
}

impl CachingChecker {
    /// `ttl = None` keeps cached reports forever
    pub fn new(
        source: Arc<dyn ReputationSource>,
        store: Arc<dyn ReportStore>,
        ttl: Option<Duration>,
    ) -> Self {
        Self { source, store, ttl }
    }

    fn is_fresh(&self, report: &ReputationReport) -> bool {
        let Some(ttl) = self.ttl else {
            return true;
        };
        // A report stamped in the future counts as fresh
        match (Utc::now() - report.fetched_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

#[async_trait]
impl Checker for CachingChecker {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn check(&self, ip: IpAddr) -> Result<ReputationReport> {
        let name = self.source.name();

        // Store errors surface as-is; they are never treated as a miss
        if let Some(cached) = self.store.get(name, ip).await? {
            if self.is_fresh(&cached) {
                debug!(checker = name, ip = %ip, "Using cached report");
                return Ok(cached);
            }
            debug!(checker = name, ip = %ip, "Cached report is stale");
        }

        let report = self
            .source
            .fetch(ip)
            .await
            .map_err(|e| Error::checker(name, e.to_string()))?;

        self.store.put(name, &report).await?;
        info!(
            checker = name,
            ip = %ip,
            score = report.abuse_confidence_score,
            "Fetched and cached reputation report"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ReputationSource for CountingSource {
        fn name(&self) -> &str {
            "Counting"
        }

        async fn fetch(&self, ip: IpAddr) -> Result<ReputationReport> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(ReputationReport {
                ip,
                abuse_confidence_score: 10 + n as u8,
                country_code: None,
                usage_type: None,
                isp: None,
                total_reports: 0,
                num_distinct_users: 0,
                last_reported_at: None,
                fetched_at: Utc::now() - chrono::Duration::hours(2),
            })
        }
    }

    #[tokio::test]
    async fn test_stale_report_is_refetched() {
        let source = Arc::new(CountingSource { fetches: AtomicUsize::new(0) });
        let checker = CachingChecker::new(
            source.clone(),
            Arc::new(MemoryStore::new()),
            Some(Duration::from_secs(3600)),
        );
        let ip: IpAddr = "192.0.2.44".parse().unwrap();

        assert_eq!(checker.check(ip).await.unwrap().abuse_confidence_score, 10);
        assert_eq!(checker.check(ip).await.unwrap().abuse_confidence_score, 11);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_ttl_cache_never_expires() {
        let source = Arc::new(CountingSource { fetches: AtomicUsize::new(0) });
        let checker = CachingChecker::new(source.clone(), Arc::new(MemoryStore::new()), None);
        let ip: IpAddr = "192.0.2.44".parse().unwrap();

        checker.check(ip).await.unwrap();
        checker.check(ip).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
