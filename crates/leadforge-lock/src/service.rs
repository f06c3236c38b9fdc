//! Distributed configuration lock service.

use crate::metrics::LockMetrics;
use chrono::Utc;
use dashmap::DashMap;
use leadforge_types::enums::LockKind;
use leadforge_types::error::{Error, Result};
use leadforge_types::ids::LockId;
use leadforge_types::store::{ConfigLockRow, ConfigLockStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// Distributed lock service: mutual exclusion over operations that update a
/// configuration identified by its fingerprint.
///
/// A node-local mutex per fingerprint serializes contenders on the same
/// process before they race on the store, avoiding
/// thundering-herd inserts against the backing `ConfigLockStore`.
pub struct LockService {
    store: Arc<dyn ConfigLockStore>,
    node_mutexes: DashMap<String, Arc<AsyncMutex<()>>>,
    metrics: LockMetrics,
}

impl LockService {
    /// Build a lock service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigLockStore>) -> Self {
        Self { store, node_mutexes: DashMap::new(), metrics: LockMetrics::default() }
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> crate::metrics::LockMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn node_mutex(&self, fingerprint: &str) -> Arc<AsyncMutex<()>> {
        self.node_mutexes.entry(fingerprint.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Acquire (or renew) a lock on `fingerprint`.
    ///
    /// If an active lock exists and `owner` matches, this is treated as a
    /// renewal and `expires_at` is extended. If a different owner holds an
    /// unexpired active lock, returns `Error::LockConflict`. If the existing
    /// lock is expired, it is swept before a new row is inserted.
    pub async fn acquire(
        &self,
        fingerprint: &str,
        kind: LockKind,
        owner: &str,
        timeout: Option<Duration>,
    ) -> Result<ConfigLockRow> {
        let node_mutex = self.node_mutex(fingerprint);
        let _node_guard = node_mutex.lock().await;

        let now = Utc::now();
        if let Some(mut existing) = self.store.active_lock(fingerprint).await? {
            let expired = existing.expires_at.is_some_and(|deadline| deadline <= now);

            if !expired && existing.owner == owner {
                existing.expires_at = timeout.map(|t| now + chrono_duration(t));
                existing.updated_at = now;
                self.store.update_lock(existing.clone()).await?;
                self.metrics.record_renewed();
                return Ok(existing);
            }

            if !expired {
                self.metrics.record_conflict();
                return Err(Error::LockConflict {
                    fingerprint: fingerprint.to_string(),
                    held_by: existing.owner,
                    expires_at: existing.expires_at,
                });
            }

            // Expired: sweep before inserting the new lock.
            existing.is_active = false;
            existing.updated_at = now;
            self.store.update_lock(existing).await?;
            self.metrics.record_swept();
        }

        let row = ConfigLockRow {
            id: LockId::new(),
            config_hash: fingerprint.to_string(),
            lock_type: kind,
            owner: owner.to_string(),
            acquired_at: now,
            expires_at: timeout.map(|t| now + chrono_duration(t)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_lock(row.clone()).await?;
        self.metrics.record_acquired();
        Ok(row)
    }

    /// Release a lock. Only the owner may release it.
    pub async fn release(&self, lock_id: LockId, owner: &str) -> Result<()> {
        let Some(mut row) = self.store.get_lock(lock_id).await? else {
            return Err(Error::LockNotFound(lock_id.to_string()));
        };
        if !row.is_active {
            return Err(Error::LockNotFound(lock_id.to_string()));
        }
        if row.owner != owner {
            return Err(Error::WrongOwner {
                lock_id: lock_id.to_string(),
                expected: row.owner,
                actual: owner.to_string(),
            });
        }
        row.is_active = false;
        row.updated_at = Utc::now();
        self.store.update_lock(row).await?;
        self.metrics.record_released();
        Ok(())
    }

    /// Renew a lock. Only the owner may renew it; an owner holding a valid
    /// lock can always renew.
    pub async fn renew(&self, lock_id: LockId, owner: &str, new_timeout: Duration) -> Result<()> {
        let Some(mut row) = self.store.get_lock(lock_id).await? else {
            return Err(Error::LockNotFound(lock_id.to_string()));
        };
        if !row.is_active {
            return Err(Error::LockNotFound(lock_id.to_string()));
        }
        if row.owner != owner {
            return Err(Error::WrongOwner {
                lock_id: lock_id.to_string(),
                expected: row.owner,
                actual: owner.to_string(),
            });
        }
        let now = Utc::now();
        row.expires_at = Some(now + chrono_duration(new_timeout));
        row.updated_at = now;
        self.store.update_lock(row).await?;
        self.metrics.record_renewed();
        Ok(())
    }

    /// Check whether `fingerprint` is locked, opportunistically sweeping an
    /// expired lock encountered along the way.
    pub async fn is_locked(&self, fingerprint: &str) -> Result<(bool, Option<ConfigLockRow>)> {
        let Some(mut existing) = self.store.active_lock(fingerprint).await? else {
            return Ok((false, None));
        };
        let now = Utc::now();
        if existing.expires_at.is_some_and(|deadline| deadline <= now) {
            existing.is_active = false;
            existing.updated_at = now;
            self.store.update_lock(existing).await?;
            self.metrics.record_swept();
            return Ok((false, None));
        }
        Ok((true, Some(existing)))
    }

    /// Sweep every expired active lock across all fingerprints. Intended to
    /// be invoked periodically.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut count = 0u64;
        for mut row in self.store.all_active_locks().await? {
            if row.expires_at.is_some_and(|deadline| deadline <= now) {
                row.is_active = false;
                row.updated_at = now;
                self.store.update_lock(row).await?;
                self.metrics.record_swept();
                count += 1;
            }
        }
        Ok(count)
    }

    /// Acquire a lock for the duration of `op`, guaranteeing release on
    /// every exit path — including the operation panicking or its future
    /// being dropped due to cancellation — via [`LockGuard`]'s `Drop` impl.
    pub async fn with_lock<T, F, Fut>(
        self: Arc<Self>,
        fingerprint: &str,
        kind: LockKind,
        owner: &str,
        timeout: Option<Duration>,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let row = self.acquire(fingerprint, kind, owner, timeout).await?;
        let guard = LockGuard {
            service: self.clone(),
            lock_id: row.id,
            owner: owner.to_string(),
            released: AtomicBool::new(false),
        };
        let result = op().await;
        guard.release_now().await;
        result
    }
}

/// RAII guard returned by [`LockService::with_lock`]. Releasing is
/// idempotent: the explicit `release_now` call marks it done so the `Drop`
/// impl's fire-and-forget fallback release is a no-op on the happy path.
struct LockGuard {
    service: Arc<LockService>,
    lock_id: LockId,
    owner: String,
    released: AtomicBool,
}

impl LockGuard {
    async fn release_now(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(error) = self.service.release(self.lock_id, &self.owner).await {
            tracing::error!(lock_id = %self.lock_id, %error, "failed to release lock held by with_lock");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let service = self.service.clone();
        let lock_id = self.lock_id;
        let owner = std::mem::take(&mut self.owner);
        tokio::spawn(async move {
            if let Err(error) = service.release(lock_id, &owner).await {
                tracing::error!(%lock_id, %error, "failed to release lock during guard drop (panic or cancellation)");
            }
        });
    }
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadforge_types::store::memory::MemoryLockStore;

    fn service() -> Arc<LockService> {
        Arc::new(LockService::new(Arc::new(MemoryLockStore::default())))
    }

    #[tokio::test]
    async fn lock_conflict_then_release_then_retry_succeeds() {
        let svc = service();
        let lock = svc.acquire("fp-1", LockKind::Write, "owner-1", Some(Duration::from_secs(60))).await.unwrap();

        let conflict = svc.acquire("fp-1", LockKind::Write, "owner-2", Some(Duration::from_secs(60))).await;
        assert!(matches!(conflict, Err(Error::LockConflict { .. })));

        svc.release(lock.id, "owner-1").await.unwrap();

        let second = svc.acquire("fp-1", LockKind::Write, "owner-2", Some(Duration::from_secs(60))).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn same_owner_reacquire_is_a_renewal() {
        let svc = service();
        let first = svc.acquire("fp-1", LockKind::Write, "owner-1", Some(Duration::from_secs(60))).await.unwrap();
        let second = svc.acquire("fp-1", LockKind::Write, "owner-1", Some(Duration::from_secs(120))).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.expires_at.unwrap() > first.expires_at.unwrap());
    }

    #[tokio::test]
    async fn wrong_owner_cannot_release() {
        let svc = service();
        let lock = svc.acquire("fp-1", LockKind::Write, "owner-1", None).await.unwrap();
        let result = svc.release(lock.id, "owner-2").await;
        assert!(matches!(result, Err(Error::WrongOwner { .. })));
    }

    #[tokio::test]
    async fn expired_lock_is_swept_on_next_acquire() {
        let svc = service();
        let _first = svc
            .acquire("fp-1", LockKind::Write, "owner-1", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = svc.acquire("fp-1", LockKind::Write, "owner-2", Some(Duration::from_secs(60))).await;
        assert!(second.is_ok());
        let (locked, lock) = svc.is_locked("fp-1").await.unwrap();
        assert!(locked);
        assert_eq!(lock.unwrap().owner, "owner-2");
    }

    #[tokio::test]
    async fn cleanup_expired_sweeps_and_counts() {
        let svc = service();
        svc.acquire("fp-1", LockKind::Write, "owner-1", Some(Duration::from_millis(1))).await.unwrap();
        svc.acquire("fp-2", LockKind::Write, "owner-1", Some(Duration::from_secs(60))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let swept = svc.cleanup_expired().await.unwrap();
        assert_eq!(swept, 1);
        let (still_locked, _) = svc.is_locked("fp-2").await.unwrap();
        assert!(still_locked);
    }

    #[tokio::test]
    async fn with_lock_releases_even_when_op_errors() {
        let svc = service();
        let result: Result<()> = svc
            .clone()
            .with_lock("fp-1", LockKind::Write, "owner-1", Some(Duration::from_secs(60)), || async {
                Err(Error::PhaseFailed("boom".into()))
            })
            .await;
        assert!(result.is_err());

        let (locked, _) = svc.is_locked("fp-1").await.unwrap();
        assert!(!locked, "lock must be released even when the wrapped op fails");
    }
}
