//! Contract Test: Endpoint idempotence through the registry
//!
//! Constraints verified:
//! - Block applied twice succeeds both times and leaves one artifact
//! - Unblock with no artifact succeeds on every endpoint
//! - Sync after a block does not re-apply it

mod common;

use common::*;
use hbl_core::{EndpointAction, EndpointRegistry};

fn registry(endpoints: &[std::sync::Arc<MockEndpoint>]) -> EndpointRegistry {
    let registry = EndpointRegistry::new();
    for endpoint in endpoints {
        registry.register(endpoint.clone());
    }
    registry
}

#[tokio::test]
async fn repeated_block_leaves_one_artifact() {
    let edge = MockEndpoint::new("edge");
    let rbl = MockEndpoint::new("rbl");
    let endpoints = registry(&[edge.clone(), rbl.clone()]);
    let addr = ip("203.0.113.40");

    endpoints.execute_on_all(EndpointAction::Block, addr).await.unwrap();
    endpoints.execute_on_all(EndpointAction::Block, addr).await.unwrap();

    assert!(edge.holds(addr));
    assert!(rbl.holds(addr));
    assert_eq!(edge.block_calls(), 2);

    endpoints.execute_on_all(EndpointAction::Unblock, addr).await.unwrap();
    assert!(!edge.holds(addr), "one unblock removes the single artifact");
    assert!(!rbl.holds(addr));
}

#[tokio::test]
async fn unblock_of_absent_artifact_succeeds() {
    let edge = MockEndpoint::new("edge");
    let rbl = MockEndpoint::new("rbl");
    let endpoints = registry(&[edge.clone(), rbl.clone()]);
    let addr = ip("2001:db8::40");

    endpoints.execute_on_all(EndpointAction::Unblock, addr).await.unwrap();
    endpoints.execute_on_all(EndpointAction::Unblock, addr).await.unwrap();

    assert_eq!(edge.unblock_calls(), 2);
    assert_eq!(rbl.unblock_calls(), 2);
    assert!(!edge.holds(addr));
}

#[tokio::test]
async fn sync_after_block_does_not_reapply() {
    let edge = MockEndpoint::new("edge");
    let endpoints = registry(&[edge.clone()]);
    let addr = ip("198.51.100.40");

    endpoints.execute_on_all(EndpointAction::Block, addr).await.unwrap();
    endpoints.execute_on_all(EndpointAction::Sync, addr).await.unwrap();
    endpoints.execute_on_all(EndpointAction::Sync, addr).await.unwrap();

    assert_eq!(edge.block_calls(), 1);
    assert_eq!(edge.exists_calls(), 2);
    assert!(edge.holds(addr));
}
