//! Contract Test: Sync reconciliation
//!
//! Constraints verified:
//! - Sync re-blocks only where the artifact is missing
//! - Sync never removes anything and never touches allowed addresses
//! - A full pass continues past failing addresses and reports them

mod common;

use common::*;

#[tokio::test]
async fn sync_with_artifact_present_does_not_block() {
    let endpoint = MockEndpoint::new("edge");
    let harness = Harness::new(&[endpoint.clone()], &[]);
    let addr = ip("198.51.100.20");

    harness.service.block(request("198.51.100.20")).await.unwrap();
    assert_eq!(endpoint.block_calls(), 1);

    harness.service.sync_one(addr).await.unwrap();
    assert_eq!(endpoint.block_calls(), 1, "present artifact must not be re-applied");
    assert_eq!(endpoint.exists_calls(), 1);
}

#[tokio::test]
async fn sync_with_artifact_missing_blocks_once() {
    let endpoint = MockEndpoint::new("edge");
    let harness = Harness::new(&[endpoint.clone()], &[]);
    let addr = ip("198.51.100.21");

    harness.service.block(request("198.51.100.21")).await.unwrap();
    endpoint.forget(addr);

    harness.service.sync_one(addr).await.unwrap();
    assert_eq!(endpoint.block_calls(), 2);
    assert!(endpoint.holds(addr));
}

#[tokio::test]
async fn sync_of_allowed_address_is_a_no_op() {
    let endpoint = MockEndpoint::new("edge");
    let harness = Harness::new(&[endpoint.clone()], &[]);

    harness.service.allow(request("198.51.100.22")).await.unwrap();
    harness.service.sync_one(ip("198.51.100.22")).await.unwrap();

    assert_eq!(endpoint.exists_calls(), 0);
    assert_eq!(endpoint.block_calls(), 0);
}

#[tokio::test]
async fn sync_all_continues_past_failures() {
    let endpoint = MockEndpoint::new("edge");
    let harness = Harness::new(&[endpoint.clone()], &[]);

    harness.service.block(request("198.51.100.30")).await.unwrap();
    harness.service.block(request("198.51.100.31")).await.unwrap();
    harness.service.allow(request("198.51.100.32")).await.unwrap();

    endpoint.forget(ip("198.51.100.30"));
    endpoint.forget(ip("198.51.100.31"));
    endpoint.set_failing(true);

    let summary = harness.service.sync_all().await.unwrap();
    assert!(!summary.is_complete());
    assert_eq!(summary.failed.len(), 2);
    assert_eq!(summary.skipped, vec![ip("198.51.100.32")]);

    endpoint.set_failing(false);
    let summary = harness.service.sync_all().await.unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.synced.len(), 2);
    assert!(endpoint.holds(ip("198.51.100.30")));
    assert!(endpoint.holds(ip("198.51.100.31")));
}
