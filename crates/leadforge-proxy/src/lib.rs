//! Proxy pool management (component E): tracks managed proxies, maintains
//! the active dispensable subset, and runs concurrent health checks.

pub mod classify;
pub mod config;
pub mod entry;
pub mod pool;
pub mod sink;

pub use classify::is_proxy_related_error;
pub use config::ProxyPoolConfig;
pub use entry::{ProxyCredentials, ProxyEntry, ProxyProtocol};
pub use pool::ProxyPool;
pub use sink::{NullStatusSink, ProxyStatusChange, ProxyStatusSink};
