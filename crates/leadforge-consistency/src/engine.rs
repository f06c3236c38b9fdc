//! Consistency verification and corruption detection.

use crate::cache::ValidationCache;
use crate::fingerprint::{fingerprint, fingerprint_content_only, is_production_fingerprint};
use leadforge_types::error::{Error, Result};
use leadforge_types::store::{ConsistencyStore, LegacyConfigStateRow, VersionedConfigRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of `validate_consistency`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the data passed structural and (if applicable) checksum checks.
    pub valid: bool,
    /// Human-readable notes: checksum mismatches, advisory lock info, etc.
    pub notes: Vec<String>,
}

/// Result of `verify_integrity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityResult {
    /// Whether the recomputed digest matched `expected`.
    pub valid: bool,
    /// The digest supplied by the caller as the expected value.
    pub expected_checksum: String,
    /// The digest recomputed from the authoritative persisted content.
    pub actual_checksum: String,
}

/// A single corruption predicate that held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionKind {
    /// More than one row shares a `(config_type, config_key)` pair.
    DuplicateConfigs,
    /// A `(config_type, config_key)` pair retains more than 3 versions.
    ExcessiveVersions,
    /// A single record has more than one distinct checksum across its rows.
    ChecksumInconsistency,
    /// `updated_at < created_at` on a row.
    TimestampAnomaly,
    /// A later version has an earlier creation time than an earlier version.
    VersionSequenceAnomaly,
    /// An active lock has passed its expiry without being swept.
    ExpiredActiveLock,
    /// More than one active lock exists for a single fingerprint.
    MultipleActiveLocks,
}

/// Report produced by `detect_corruption`: empty means clean. The absence of
/// a storage table is not corruption and never appears here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorruptionReport {
    /// Every corruption predicate that held, each tagged with a human note.
    pub findings: Vec<(CorruptionKind, String)>,
}

impl CorruptionReport {
    /// Whether no corruption predicate held.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Result of `validate_transaction_atomicity`: valid iff every fingerprint
/// individually validates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicityResult {
    /// The transaction identifier under check.
    pub txn_id: String,
    /// Whether every fingerprint validated.
    pub valid: bool,
    /// Per-fingerprint validation detail.
    pub per_fingerprint: Vec<(String, ValidationResult)>,
}

/// Configuration consistency / integrity engine (component D).
pub struct ConsistencyEngine {
    store: Arc<dyn ConsistencyStore>,
    cache: ValidationCache,
}

impl ConsistencyEngine {
    /// Build a consistency engine over the given store, with the default
    /// 5-minute validation cache TTL.
    #[must_use]
    pub fn new(store: Arc<dyn ConsistencyStore>) -> Self {
        Self { store, cache: ValidationCache::new() }
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Validate a configuration's structure and (for production
    /// fingerprints) its checksum, annotating with advisory lock info.
    /// Results are cached for a short TTL keyed by fingerprint.
    pub async fn validate_consistency(&self, fp: &str, data: &Value) -> Result<ValidationResult> {
        if let Some(cached) = self.cache.get(fp) {
            return Ok(cached);
        }

        let mut notes = Vec::new();
        let mut valid = true;

        if serde_json::to_vec(data).is_err() {
            notes.push("structure invalid: value does not serialize cleanly".to_string());
            valid = false;
        }

        if valid && is_production_fingerprint(fp) {
            let recomputed = fingerprint(data);
            if recomputed != fp {
                notes.push(format!("checksum mismatch: expected {fp}, got {recomputed}"));
                valid = false;
            }
        }

        if let Some(active) = self
            .store
            .all_locks()
            .await?
            .into_iter()
            .find(|lock| lock.config_hash == fp && lock.is_active)
        {
            notes.push(format!("advisory: currently locked by {}", active.owner));
        }

        let result = ValidationResult { valid, notes };
        self.cache.insert(fp.to_string(), result.clone());
        Ok(result)
    }

    /// Fetch authoritative data for a fingerprint and verify it matches
    /// `expected`. Reads `versioned_configs` first, falling back to the
    /// legacy `domain_generation_config_states` table when unavailable, and
    /// asynchronously syncs the legacy record forward on the fallback path.
    pub async fn verify_integrity(&self, fp: &str, expected: &Value) -> Result<IntegrityResult> {
        let authoritative = self.fetch_authoritative(fp).await?;
        let actual_checksum = fingerprint(&authoritative);
        let expected_checksum = fingerprint(expected);
        Ok(IntegrityResult { valid: actual_checksum == expected_checksum, expected_checksum, actual_checksum })
    }

    async fn fetch_authoritative(&self, fp: &str) -> Result<Value> {
        let mut versioned = self.store.versioned_configs(fp).await?;
        versioned.sort_by_key(|row| row.version);
        if let Some(latest) = versioned.into_iter().next_back() {
            return Ok(latest.config_value);
        }

        if let Some(legacy) = self.store.legacy_config_state(fp).await? {
            if let Err(error) = self.store.sync_legacy(legacy.clone()).await {
                tracing::warn!(fingerprint = %fp, %error, "write-behind sync of legacy config state failed");
            }
            return Ok(serde_json::json!({
                "config_hash": legacy.config_hash,
                "config_details": legacy.config_details,
            }));
        }

        Err(Error::Store(format!("no configuration found for fingerprint {fp}")))
    }

    /// Check for duplicate records, excessive retained versions, checksum
    /// inconsistency, timestamp anomalies, and lock anomalies for a
    /// fingerprint.
    pub async fn detect_corruption(&self, fp: &str) -> Result<CorruptionReport> {
        let mut report = CorruptionReport::default();

        let versioned = self.store.versioned_configs(fp).await?;
        let mut groups: HashMap<(String, String), Vec<&VersionedConfigRow>> = HashMap::new();
        for row in &versioned {
            groups.entry((row.config_type.clone(), row.config_key.clone())).or_default().push(row);
        }

        for ((config_type, config_key), rows) in &groups {
            if rows.len() > 1 {
                report.findings.push((
                    CorruptionKind::DuplicateConfigs,
                    format!("{} rows for ({config_type}, {config_key})", rows.len()),
                ));
            }
            if rows.len() > 3 {
                report.findings.push((
                    CorruptionKind::ExcessiveVersions,
                    format!("{} versions retained for ({config_type}, {config_key})", rows.len()),
                ));
            }
            let distinct_checksums: std::collections::HashSet<&str> =
                rows.iter().map(|r| r.checksum.as_str()).collect();
            if distinct_checksums.len() > 1 {
                report.findings.push((
                    CorruptionKind::ChecksumInconsistency,
                    format!("{} distinct checksums for ({config_type}, {config_key})", distinct_checksums.len()),
                ));
            }

            let mut by_version = rows.clone();
            by_version.sort_by_key(|r| r.version);
            for window in by_version.windows(2) {
                let [earlier, later] = window else { continue };
                if later.created_at < earlier.created_at {
                    report.findings.push((
                        CorruptionKind::VersionSequenceAnomaly,
                        format!(
                            "version {} created at {} before version {} created at {}",
                            later.version, later.created_at, earlier.version, earlier.created_at
                        ),
                    ));
                }
            }
        }

        for row in &versioned {
            if row.updated_at < row.created_at {
                report.findings.push((
                    CorruptionKind::TimestampAnomaly,
                    format!("({}, {}) v{} updated_at before created_at", row.config_type, row.config_key, row.version),
                ));
            }
        }

        let locks = self.store.all_locks().await?;
        let now = chrono::Utc::now();
        for lock in &locks {
            if lock.is_active && lock.expires_at.is_some_and(|deadline| deadline <= now) {
                report.findings.push((
                    CorruptionKind::ExpiredActiveLock,
                    format!("lock {} for {} expired at {:?}", lock.id, lock.config_hash, lock.expires_at),
                ));
            }
        }
        let active_for_fp = locks.iter().filter(|lock| lock.config_hash == fp && lock.is_active).count();
        if active_for_fp > 1 {
            report.findings.push((
                CorruptionKind::MultipleActiveLocks,
                format!("{active_for_fp} active locks for fingerprint {fp}"),
            ));
        }

        Ok(report)
    }

    /// Valid iff every fingerprint in `fps` individually validates against
    /// its own authoritative data.
    pub async fn validate_transaction_atomicity(
        &self,
        txn_id: &str,
        fps: &[String],
    ) -> Result<AtomicityResult> {
        let mut per_fingerprint = Vec::with_capacity(fps.len());
        let mut all_valid = true;
        for fp in fps {
            let authoritative = self.fetch_authoritative(fp).await?;
            let result = self.validate_consistency(fp, &authoritative).await?;
            all_valid &= result.valid;
            per_fingerprint.push((fp.clone(), result));
        }
        Ok(AtomicityResult { txn_id: txn_id.to_string(), valid: all_valid, per_fingerprint })
    }
}

/// Build the content-only fingerprint for a legacy row, for callers wiring
/// up the lock service and consistency engine against the same fingerprint.
#[must_use]
pub fn fingerprint_legacy_row(row: &LegacyConfigStateRow) -> String {
    fingerprint_content_only(&serde_json::json!({
        "config_hash": row.config_hash,
        "config_details": row.config_details,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadforge_types::enums::LockKind;
    use leadforge_types::ids::LockId;
    use leadforge_types::store::memory::MemoryConsistencyStore;
    use leadforge_types::store::ConfigLockRow;
    use serde_json::json;

    fn engine() -> (Arc<MemoryConsistencyStore>, ConsistencyEngine) {
        let store = Arc::new(MemoryConsistencyStore::default());
        let engine = ConsistencyEngine::new(store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn tampered_checksum_fails_integrity_and_reports_both_digests() {
        let (store, engine) = engine();
        let value = json!({"config_hash": "h", "last_offset": 1, "config_details": {"a": 1}});
        let real_checksum = fingerprint(&value);

        store.seed_versioned(VersionedConfigRow {
            config_type: "domain_generation".into(),
            config_key: real_checksum.clone(),
            version: 1,
            config_value: json!({"config_hash": "h", "last_offset": 1, "config_details": {"a": 2}}), // tampered
            checksum: real_checksum.clone(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });

        let result = engine.verify_integrity(&real_checksum, &value).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.expected_checksum, real_checksum);
        assert_ne!(result.actual_checksum, result.expected_checksum);
    }

    #[tokio::test]
    async fn detect_corruption_flags_duplicate_and_checksum_inconsistency() {
        let (store, engine) = engine();
        let fp = "dup-key";
        for (checksum, version) in [("c1", 1u64), ("c2", 2)] {
            store.seed_versioned(VersionedConfigRow {
                config_type: "domain_generation".into(),
                config_key: fp.into(),
                version,
                config_value: json!({}),
                checksum: checksum.into(),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            });
        }

        let report = engine.detect_corruption(fp).await.unwrap();
        assert!(!report.is_clean());
        assert!(report.findings.iter().any(|(kind, _)| *kind == CorruptionKind::DuplicateConfigs));
        assert!(report.findings.iter().any(|(kind, _)| *kind == CorruptionKind::ChecksumInconsistency));
    }

    #[tokio::test]
    async fn missing_storage_table_is_not_corruption() {
        let (_store, engine) = engine();
        let report = engine.detect_corruption("no-such-fp").await.unwrap();
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn expired_active_lock_and_multiple_active_locks_are_detected() {
        let (store, engine) = engine();
        let fp = "fp-locks";
        let now = chrono::Utc::now();
        store.seed_lock(ConfigLockRow {
            id: LockId::new(),
            config_hash: fp.into(),
            lock_type: LockKind::Write,
            owner: "a".into(),
            acquired_at: now,
            expires_at: Some(now - chrono::Duration::seconds(10)),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        store.seed_lock(ConfigLockRow {
            id: LockId::new(),
            config_hash: fp.into(),
            lock_type: LockKind::Write,
            owner: "b".into(),
            acquired_at: now,
            expires_at: Some(now + chrono::Duration::seconds(60)),
            is_active: true,
            created_at: now,
            updated_at: now,
        });

        let report = engine.detect_corruption(fp).await.unwrap();
        assert!(report.findings.iter().any(|(kind, _)| *kind == CorruptionKind::ExpiredActiveLock));
        assert!(report.findings.iter().any(|(kind, _)| *kind == CorruptionKind::MultipleActiveLocks));
    }

    #[tokio::test]
    async fn validate_consistency_is_cached() {
        let (_store, engine) = engine();
        let value = json!({"config_hash": "h"});
        let first = engine.validate_consistency("test-fp", &value).await.unwrap();
        assert!(engine.cache_size() >= 1);
        let second = engine.validate_consistency("test-fp", &value).await.unwrap();
        assert_eq!(first.valid, second.valid);
    }

    #[tokio::test]
    async fn legacy_fallback_is_read_and_synced_idempotently() {
        let (store, engine) = engine();
        let fp = "legacy-fp";
        store.seed_legacy(LegacyConfigStateRow {
            config_hash: fp.into(),
            config_details: json!({"a": 1}),
            updated_at: chrono::Utc::now(),
        });

        let expected = json!({"config_hash": fp, "config_details": {"a": 1}});
        let first = engine.verify_integrity(fp, &expected).await.unwrap();
        let second = engine.verify_integrity(fp, &expected).await.unwrap();
        assert_eq!(first, second);
    }
}
