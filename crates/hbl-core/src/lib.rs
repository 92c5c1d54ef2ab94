// # hbl-core
//
// Core library for the HBL block-list enforcement system.
//
// ## Architecture Overview
//
// - **Endpoint**: Trait for enforcing a block on a backend (edge ACL, RBL zone)
// - **Checker / ReputationSource**: Reputation lookups with a report cache
// - **Alerter**: Trait for best-effort notifications
// - **AddressStore / ReportStore**: Authoritative records and cached reports
// - **BlocklistService**: Orchestrates block, allow, delete and sync
// - **FactoryRegistry**: Plugin-based construction of backends from config
//
// ## Design Principles
//
// 1. **Single source of truth**: the address store decides, endpoints follow
// 2. **Fail-fast fan-out**: the first endpoint error stops the call, sync heals
// 3. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library

pub mod alert;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod reputation;
pub mod service;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use alert::ChannelAlerter;
pub use config::{AlerterConfig, CheckerConfig, EndpointConfig, HblConfig, ServiceConfig, StoreConfig};
pub use error::{Error, Result};
pub use model::{Action, Address, Alert, AlertAction, EndpointAction, NewAddress, ReputationReport, parse_ip};
pub use registry::{AlerterRegistry, CheckerRegistry, EndpointRegistry, FactoryRegistry};
pub use reputation::CachingChecker;
pub use service::{BlocklistService, SyncSummary};
pub use store::{FileStore, MemoryStore, StoreHandles, open_store};
pub use traits::{AddressStore, Alerter, AlerterFactory, Checker, Endpoint, EndpointFactory};
pub use traits::{ReportStore, ReputationSource, SourceFactory};
