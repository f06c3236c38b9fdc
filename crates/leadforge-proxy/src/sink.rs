//! Status-change notification seam.
//!
//! The pool has no business knowing how broadcasts are wired up; it depends
//! only on this trait, which `leadforge-hub` adapts to its own message
//! taxonomy at the composition root.

use async_trait::async_trait;

/// A health or enablement transition for a single proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyStatusChange {
    /// The proxy whose status changed.
    pub proxy_id: String,
    /// Whether it is now healthy.
    pub is_healthy: bool,
    /// Whether it is currently eligible for dispensing.
    pub is_active: bool,
}

/// Receiver for proxy status transitions, implemented by whatever publishes
/// `proxy.status` events.
#[async_trait]
pub trait ProxyStatusSink: Send + Sync {
    /// Called once per observed transition (not on every health check, only
    /// on a change — "emits status changes only on transitions").
    async fn proxy_status_changed(&self, change: ProxyStatusChange);
}

/// A sink that discards every change; the default when no broadcast hub is
/// wired up (e.g. in tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatusSink;

#[async_trait]
impl ProxyStatusSink for NullStatusSink {
    async fn proxy_status_changed(&self, _change: ProxyStatusChange) {}
}
