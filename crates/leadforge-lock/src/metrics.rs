//! Lock service metrics: acquired/released/timeouts/conflicts/active.

use std::sync::atomic::{AtomicU64, Ordering};

/// Integer counters exposed by the lock service.
#[derive(Debug, Default)]
pub struct LockMetrics {
    acquired: AtomicU64,
    released: AtomicU64,
    timeouts: AtomicU64,
    conflicts: AtomicU64,
    active: AtomicU64,
}

impl LockMetrics {
    pub(crate) fn record_acquired(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_renewed(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_swept(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Snapshot the current counters.
    #[must_use]
    pub fn snapshot(&self) -> LockMetricsSnapshot {
        LockMetricsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`LockMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockMetricsSnapshot {
    /// Total acquisitions and renewals.
    pub acquired: u64,
    /// Total releases.
    pub released: u64,
    /// Total acquisition timeouts observed by callers.
    pub timeouts: u64,
    /// Total conflicts returned.
    pub conflicts: u64,
    /// Locks currently believed active.
    pub active: u64,
}
