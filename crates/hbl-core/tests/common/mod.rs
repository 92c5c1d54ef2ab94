//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! backends the service touched.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use hbl_core::error::{Error, Result};
use hbl_core::{
    AddressStore, Address, Alert, Alerter, AlerterRegistry, BlocklistService, CachingChecker,
    CheckerRegistry, Endpoint, EndpointRegistry, MemoryStore, NewAddress, ReportStore,
    ReputationReport, ReputationSource, StoreHandles,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An endpoint that keeps its artifacts in memory and counts calls
pub struct MockEndpoint {
    name: &'static str,
    artifacts: Mutex<HashSet<IpAddr>>,
    block_calls: AtomicUsize,
    unblock_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MockEndpoint {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            artifacts: Mutex::new(HashSet::new()),
            block_calls: AtomicUsize::new(0),
            unblock_calls: AtomicUsize::new(0),
            exists_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Make block and unblock fail until cleared
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }

    pub fn unblock_calls(&self) -> usize {
        self.unblock_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn holds(&self, ip: IpAddr) -> bool {
        self.artifacts.lock().unwrap().contains(&ip)
    }

    /// Drop an artifact behind the service's back, simulating drift
    pub fn forget(&self, ip: IpAddr) {
        self.artifacts.lock().unwrap().remove(&ip);
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    fn name(&self) -> &str {
        self.name
    }

    async fn block(&self, ip: IpAddr) -> Result<()> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::provider(self.name, "backend unavailable"));
        }
        self.artifacts.lock().unwrap().insert(ip);
        Ok(())
    }

    async fn unblock(&self, ip: IpAddr) -> Result<()> {
        self.unblock_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::provider(self.name, "backend unavailable"));
        }
        self.artifacts.lock().unwrap().remove(&ip);
        Ok(())
    }

    async fn exists(&self, ip: IpAddr) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.artifacts.lock().unwrap().contains(&ip))
    }
}

/// A reputation source returning a fixed report and counting fetches
pub struct MockSource {
    name: &'static str,
    score: u8,
    fetches: AtomicUsize,
    failing: AtomicBool,
}

impl MockSource {
    pub fn new(name: &'static str, score: u8) -> Arc<Self> {
        Arc::new(Self {
            name,
            score,
            fetches: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReputationSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, ip: IpAddr) -> Result<ReputationReport> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::rate_limited("daily quota exhausted"));
        }
        Ok(ReputationReport {
            ip,
            abuse_confidence_score: self.score,
            country_code: Some("DE".to_string()),
            usage_type: Some("Data Center/Web Hosting/Transit".to_string()),
            isp: Some("Example Hosting".to_string()),
            total_reports: 17,
            num_distinct_users: 5,
            last_reported_at: Some(Utc::now()),
            fetched_at: Utc::now(),
        })
    }
}

/// Alerter that remembers every alert it receives
#[derive(Default)]
pub struct RecordingAlerter {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Alerter for RecordingAlerter {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn alert(&self, alert: &Alert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Alerter that always fails
pub struct FailingAlerter;

#[async_trait]
impl Alerter for FailingAlerter {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn alert(&self, _alert: &Alert) -> Result<()> {
        Err(Error::http("webhook returned 500"))
    }
}

/// Store whose writes and report lookups fail
pub struct FailingStore;

#[async_trait]
impl AddressStore for FailingStore {
    async fn create(&self, _address: &Address) -> Result<()> {
        Err(Error::store("disk full"))
    }

    async fn get(&self, _ip: IpAddr) -> Result<Option<Address>> {
        Ok(None)
    }

    async fn get_all(&self) -> Result<Vec<Address>> {
        Err(Error::store("disk full"))
    }

    async fn delete(&self, _ip: IpAddr) -> Result<()> {
        Err(Error::store("disk full"))
    }
}

#[async_trait]
impl ReportStore for FailingStore {
    async fn get(&self, _checker: &str, _ip: IpAddr) -> Result<Option<ReputationReport>> {
        Err(Error::store("report table unavailable"))
    }

    async fn put(&self, _checker: &str, _report: &ReputationReport) -> Result<()> {
        Err(Error::store("report table unavailable"))
    }

    async fn delete(&self, _ip: IpAddr) -> Result<()> {
        Err(Error::store("report table unavailable"))
    }
}

/// A service over a memory store with the given doubles registered
pub struct Harness {
    pub service: BlocklistService,
    pub store: Arc<MemoryStore>,
    pub alerts: Arc<RecordingAlerter>,
}

impl Harness {
    pub fn new(endpoints: &[Arc<MockEndpoint>], sources: &[Arc<MockSource>]) -> Self {
        let store = Arc::new(MemoryStore::new());
        let alerts = RecordingAlerter::new();

        let endpoint_registry = EndpointRegistry::new();
        for endpoint in endpoints {
            endpoint_registry.register(endpoint.clone());
        }

        let checker_registry = CheckerRegistry::new();
        for source in sources {
            checker_registry.register(Arc::new(CachingChecker::new(
                source.clone(),
                store.clone(),
                None,
            )));
        }

        let alerter_registry = AlerterRegistry::new();
        alerter_registry.register(alerts.clone());

        let service = BlocklistService::new(
            StoreHandles::shared(store.clone()),
            endpoint_registry,
            checker_registry,
            alerter_registry,
        );

        Self {
            service,
            store,
            alerts,
        }
    }
}

pub fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

pub fn request(value: &str) -> NewAddress {
    NewAddress::parse(value, "ops@example.com", "ssh brute force").unwrap()
}
