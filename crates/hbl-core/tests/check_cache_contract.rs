//! Contract Test: Cache-or-fetch reputation checks
//!
//! Constraints verified:
//! - A cache miss calls the remote once and persists the report
//! - A cache hit returns the persisted report verbatim without a remote call
//! - Store lookup errors surface instead of falling through to the remote
//! - Remote failures are hard errors naming the checker

mod common;

use common::*;
use hbl_core::{CachingChecker, Checker, Error, ReportStore};
use std::sync::Arc;

#[tokio::test]
async fn first_check_fetches_then_cache_serves() {
    let source = MockSource::new("AbuseIPDB", 93);
    let harness = Harness::new(&[], &[source.clone()]);
    let addr = ip("203.0.113.80");

    let first = harness.service.check("AbuseIPDB", addr).await.unwrap();
    assert_eq!(source.fetches(), 1);
    assert_eq!(first.abuse_confidence_score, 93);

    let persisted = ReportStore::get(harness.store.as_ref(), "AbuseIPDB", addr)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted, first);

    let second = harness.service.check("AbuseIPDB", addr).await.unwrap();
    assert_eq!(source.fetches(), 1, "cache hit must not call the remote");
    assert_eq!(second, first);
}

#[tokio::test]
async fn unknown_checker_is_not_registered() {
    let harness = Harness::new(&[], &[]);
    let err = harness
        .service
        .check("AbuseIPDB", ip("203.0.113.81"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotRegistered { kind: "checker", .. }));
}

#[tokio::test]
async fn store_errors_are_not_masked_by_fetch() {
    let source = MockSource::new("AbuseIPDB", 10);
    let checker = CachingChecker::new(source.clone(), Arc::new(FailingStore), None);

    let err = checker.check(ip("203.0.113.82")).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(source.fetches(), 0);
}

#[tokio::test]
async fn remote_failure_names_the_checker() {
    let source = MockSource::new("AbuseIPDB", 10);
    source.set_failing(true);
    let harness = Harness::new(&[], &[source.clone()]);
    let addr = ip("203.0.113.83");

    let err = harness.service.check("AbuseIPDB", addr).await.unwrap_err();
    assert!(matches!(err, Error::Checker { ref checker, .. } if checker == "AbuseIPDB"));

    // Nothing cached on failure; the next call retries the remote
    source.set_failing(false);
    harness.service.check("AbuseIPDB", addr).await.unwrap();
    assert_eq!(source.fetches(), 2);
}
