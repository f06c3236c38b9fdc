//! Persistent store interface.
//!
//! Concrete persistence (SQL drivers) is an external collaborator; these
//! traits are the seam the core depends on. An in-memory implementation
//! lives in `memory` for tests and for wiring components together without a
//! real database.

use crate::domain::{Campaign, CampaignCounters, GeneratedDomain};
use crate::error::Result;
use crate::ids::CampaignId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row of `versioned_configs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedConfigRow {
    /// Discriminator for the kind of configuration (e.g. `"domain_generation"`).
    pub config_type: String,
    /// Key within `config_type`.
    pub config_key: String,
    /// Monotonic version; highest wins on upsert.
    pub version: u64,
    /// The configuration payload.
    pub config_value: serde_json::Value,
    /// Stored checksum for this row.
    pub checksum: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row last-update time.
    pub updated_at: DateTime<Utc>,
}

/// A row of the legacy `domain_generation_config_states` fallback table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyConfigStateRow {
    /// The content fingerprint this row represents.
    pub config_hash: String,
    /// Opaque configuration detail payload.
    pub config_details: serde_json::Value,
    /// Last-update time.
    pub updated_at: DateTime<Utc>,
}

/// A row of `config_locks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLockRow {
    /// Opaque lock id.
    pub id: crate::ids::LockId,
    /// Fingerprint this lock guards.
    pub config_hash: String,
    /// Advisory lock kind.
    pub lock_type: crate::enums::LockKind,
    /// Opaque owner identifier.
    pub owner: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires, if bounded.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the lock is still active.
    pub is_active: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row last-update time.
    pub updated_at: DateTime<Utc>,
}

/// Store abstraction consumed by the config lock service (component C).
#[async_trait]
pub trait ConfigLockStore: Send + Sync {
    /// Fetch the active lock for a fingerprint, if any.
    async fn active_lock(&self, config_hash: &str) -> Result<Option<ConfigLockRow>>;
    /// Insert a new active lock row.
    async fn insert_lock(&self, row: ConfigLockRow) -> Result<()>;
    /// Update an existing lock row (renewal, release, deactivation).
    async fn update_lock(&self, row: ConfigLockRow) -> Result<()>;
    /// Fetch a lock by id regardless of active state.
    async fn get_lock(&self, id: crate::ids::LockId) -> Result<Option<ConfigLockRow>>;
    /// List every active lock across all fingerprints (for reaping/corruption checks).
    async fn all_active_locks(&self) -> Result<Vec<ConfigLockRow>>;
}

/// Store abstraction consumed by the consistency engine (component D).
#[async_trait]
pub trait ConsistencyStore: Send + Sync {
    /// Fetch the versioned-config rows for a fingerprint (may have several
    /// distinct `(config_type, config_key)` entries sharing a fingerprint).
    async fn versioned_configs(&self, config_hash: &str) -> Result<Vec<VersionedConfigRow>>;
    /// Fetch the legacy fallback row for a fingerprint.
    async fn legacy_config_state(&self, config_hash: &str) -> Result<Option<LegacyConfigStateRow>>;
    /// Write the legacy row forward (write-behind sync; fire-and-forget by the caller).
    async fn sync_legacy(&self, row: LegacyConfigStateRow) -> Result<()>;
    /// Fetch every config lock, active or not, for corruption detection.
    async fn all_locks(&self) -> Result<Vec<ConfigLockRow>>;
}

/// Store abstraction consumed by the phase orchestrator (component B).
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Fetch a campaign by id.
    async fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>>;
    /// Persist a campaign (insert or full overwrite).
    async fn put_campaign(&self, campaign: Campaign) -> Result<()>;
    /// Fetch every generated domain for a campaign, ordered by offset.
    async fn domains(&self, campaign_id: CampaignId) -> Result<Vec<GeneratedDomain>>;
    /// Upsert a single generated domain keyed by `(campaign_id, offset_index)`.
    async fn put_domain(&self, domain: GeneratedDomain) -> Result<()>;
    /// Fetch the durable counters row for a campaign.
    async fn counters(&self, campaign_id: CampaignId) -> Result<CampaignCounters>;
    /// Overwrite the durable counters row (reconciliation's `auto_correct` path).
    async fn put_counters(&self, campaign_id: CampaignId, counters: CampaignCounters) -> Result<()>;
}

/// In-memory reference implementations of the store traits, for tests and
/// for wiring components together without a real database.
pub mod memory {
    use super::{
        async_trait, BTreeMap, Campaign, CampaignCounters, CampaignId, CampaignStore,
        ConfigLockRow, ConfigLockStore, ConsistencyStore, GeneratedDomain, LegacyConfigStateRow,
        Result, VersionedConfigRow,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-memory config lock store.
    #[derive(Default, Clone)]
    pub struct MemoryLockStore {
        locks: Arc<Mutex<BTreeMap<crate::ids::LockId, ConfigLockRow>>>,
    }

    #[async_trait]
    impl ConfigLockStore for MemoryLockStore {
        async fn active_lock(&self, config_hash: &str) -> Result<Option<ConfigLockRow>> {
            Ok(self
                .locks
                .lock()
                .values()
                .find(|row| row.is_active && row.config_hash == config_hash)
                .cloned())
        }

        async fn insert_lock(&self, row: ConfigLockRow) -> Result<()> {
            self.locks.lock().insert(row.id, row);
            Ok(())
        }

        async fn update_lock(&self, row: ConfigLockRow) -> Result<()> {
            self.locks.lock().insert(row.id, row);
            Ok(())
        }

        async fn get_lock(&self, id: crate::ids::LockId) -> Result<Option<ConfigLockRow>> {
            Ok(self.locks.lock().get(&id).cloned())
        }

        async fn all_active_locks(&self) -> Result<Vec<ConfigLockRow>> {
            Ok(self.locks.lock().values().filter(|row| row.is_active).cloned().collect())
        }
    }

    /// In-memory consistency store.
    #[derive(Default, Clone)]
    pub struct MemoryConsistencyStore {
        versioned: Arc<Mutex<Vec<VersionedConfigRow>>>,
        legacy: Arc<Mutex<BTreeMap<String, LegacyConfigStateRow>>>,
        locks: Arc<Mutex<Vec<ConfigLockRow>>>,
    }

    impl MemoryConsistencyStore {
        /// Seed a versioned-config row (test helper).
        pub fn seed_versioned(&self, row: VersionedConfigRow) {
            self.versioned.lock().push(row);
        }

        /// Seed a legacy fallback row (test helper).
        pub fn seed_legacy(&self, row: LegacyConfigStateRow) {
            self.legacy.lock().insert(row.config_hash.clone(), row);
        }

        /// Seed a lock row (test helper).
        pub fn seed_lock(&self, row: ConfigLockRow) {
            self.locks.lock().push(row);
        }
    }

    #[async_trait]
    impl ConsistencyStore for MemoryConsistencyStore {
        async fn versioned_configs(&self, config_hash: &str) -> Result<Vec<VersionedConfigRow>> {
            Ok(self
                .versioned
                .lock()
                .iter()
                .filter(|row| row.checksum == config_hash || row_hash_matches(row, config_hash))
                .cloned()
                .collect())
        }

        async fn legacy_config_state(&self, config_hash: &str) -> Result<Option<LegacyConfigStateRow>> {
            Ok(self.legacy.lock().get(config_hash).cloned())
        }

        async fn sync_legacy(&self, row: LegacyConfigStateRow) -> Result<()> {
            self.legacy.lock().insert(row.config_hash.clone(), row);
            Ok(())
        }

        async fn all_locks(&self) -> Result<Vec<ConfigLockRow>> {
            Ok(self.locks.lock().clone())
        }
    }

    /// A versioned-config row is considered to belong to a fingerprint
    /// either by its stored checksum, or — for rows seeded directly under a
    /// test fingerprint key — by an exact `config_key` match. This keeps the
    /// fake permissive enough for tests that seed rows without recomputing
    /// a real checksum.
    fn row_hash_matches(row: &VersionedConfigRow, config_hash: &str) -> bool {
        row.config_key == config_hash
    }

    /// In-memory campaign store.
    #[derive(Default, Clone)]
    pub struct MemoryCampaignStore {
        campaigns: Arc<Mutex<BTreeMap<CampaignId, Campaign>>>,
        domains: Arc<Mutex<BTreeMap<(CampaignId, u64), GeneratedDomain>>>,
        counters: Arc<Mutex<BTreeMap<CampaignId, CampaignCounters>>>,
    }

    #[async_trait]
    impl CampaignStore for MemoryCampaignStore {
        async fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
            Ok(self.campaigns.lock().get(&id).cloned())
        }

        async fn put_campaign(&self, campaign: Campaign) -> Result<()> {
            self.campaigns.lock().insert(campaign.id, campaign);
            Ok(())
        }

        async fn domains(&self, campaign_id: CampaignId) -> Result<Vec<GeneratedDomain>> {
            Ok(self
                .domains
                .lock()
                .iter()
                .filter(|((cid, _), _)| *cid == campaign_id)
                .map(|(_, d)| d.clone())
                .collect())
        }

        async fn put_domain(&self, domain: GeneratedDomain) -> Result<()> {
            self.domains.lock().insert((domain.campaign_id, domain.offset_index), domain);
            Ok(())
        }

        async fn counters(&self, campaign_id: CampaignId) -> Result<CampaignCounters> {
            Ok(self.counters.lock().get(&campaign_id).copied().unwrap_or_default())
        }

        async fn put_counters(&self, campaign_id: CampaignId, counters: CampaignCounters) -> Result<()> {
            self.counters.lock().insert(campaign_id, counters);
            Ok(())
        }
    }
}
