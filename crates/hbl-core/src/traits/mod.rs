//! Core traits for the HBL system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Endpoint`]: Enforce blocks on a backend
//! - [`Checker`] / [`ReputationSource`]: Reputation lookups
//! - [`Alerter`]: Notification sinks
//! - [`AddressStore`] / [`ReportStore`]: Authoritative records and report cache

pub mod alerter;
pub mod checker;
pub mod endpoint;
pub mod store;

pub use alerter::{Alerter, AlerterFactory};
pub use checker::{Checker, ReputationSource, SourceFactory};
pub use endpoint::{Endpoint, EndpointFactory};
pub use store::{AddressStore, ReportStore};
