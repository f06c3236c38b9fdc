//! Short-TTL cache for validation results.
//!
//! Protected by a reader/writer discipline: many validators may read
//! concurrently, insertions are serialized by the same lock.

use crate::engine::ValidationResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Default cache TTL: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::minutes(5);

struct CachedEntry {
    result: ValidationResult,
    validation_time: DateTime<Utc>,
}

/// A small TTL cache of validation results, keyed by fingerprint.
///
/// Entries expire by timestamp on read, not by background eviction.
pub struct ValidationCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedEntry>>,
}

impl ValidationCache {
    /// Build a cache with the default 5-minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Build a cache with an explicit TTL (primarily for tests).
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    /// Fetch a cached result for `fingerprint`, if present and not expired.
    /// An expired entry is treated as absent (and left in place; it will be
    /// overwritten on the next `insert`).
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<ValidationResult> {
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = entries.get(fingerprint)?;
        if Utc::now() - entry.validation_time > self.ttl {
            return None;
        }
        Some(entry.result.clone())
    }

    /// Insert or overwrite a validation result for `fingerprint`, timestamped now.
    pub fn insert(&self, fingerprint: String, result: ValidationResult) {
        let mut entries = self.entries.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(fingerprint, CachedEntry { result, validation_time: Utc::now() });
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Whether the cache currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ValidationResult;

    #[test]
    fn expired_entries_are_treated_as_absent() {
        let cache = ValidationCache::with_ttl(Duration::milliseconds(0));
        cache.insert("fp".into(), ValidationResult { valid: true, notes: vec![] });
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get("fp").is_none());
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = ValidationCache::with_ttl(Duration::minutes(5));
        cache.insert("fp".into(), ValidationResult { valid: true, notes: vec![] });
        assert!(cache.get("fp").is_some());
    }
}
