//! Distributed configuration lock service.
//!
//! Grants mutual exclusion over operations that update a configuration
//! identified by its fingerprint. Persistence is an external collaborator;
//! this crate depends only on the `leadforge_types::store::ConfigLockStore`
//! trait.

pub mod config;
pub mod metrics;
pub mod service;

pub use config::LockServiceConfig;
pub use metrics::{LockMetrics, LockMetricsSnapshot};
pub use service::LockService;
