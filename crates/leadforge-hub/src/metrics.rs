//! Hub metrics: total/active connections, retries, drops.

use std::sync::atomic::{AtomicU64, Ordering};

/// Integer counters exposed by the broadcast hub.
#[derive(Debug, Default)]
pub struct HubMetrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages_sent: AtomicU64,
    retries_queued: AtomicU64,
    retries_succeeded: AtomicU64,
    drops: AtomicU64,
}

impl HubMetrics {
    pub(crate) fn record_register(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unregister(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_queued(&self) {
        self.retries_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_succeeded(&self) {
        self.retries_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the current counters.
    #[must_use]
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            retries_queued: self.retries_queued.load(Ordering::Relaxed),
            retries_succeeded: self.retries_succeeded.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`HubMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubMetricsSnapshot {
    /// Total clients ever registered.
    pub total_connections: u64,
    /// Clients currently registered.
    pub active_connections: u64,
    /// Messages successfully enqueued on first attempt.
    pub messages_sent: u64,
    /// Messages parked in the retry queue after a full-queue enqueue failure.
    pub retries_queued: u64,
    /// Retries that eventually succeeded.
    pub retries_succeeded: u64,
    /// Messages dropped after exhausting retry attempts.
    pub drops: u64,
}
