//! Content-addressed configuration fingerprinting.

use crate::canonical::canonical_bytes;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// The stable fields that participate in a fingerprint. Everything else —
/// timestamps and other volatile bookkeeping — is excluded even before
/// canonicalization runs.
pub const CONTENT_FIELDS: &[&str] = &["config_hash", "last_offset", "config_details"];

/// Extract the content-only subset of a configuration value: just the
/// stable fields listed in [`CONTENT_FIELDS`], if present.
#[must_use]
pub fn content_only_subset(full: &Value) -> Value {
    let mut subset = Map::new();
    if let Value::Object(map) = full {
        for key in CONTENT_FIELDS {
            if let Some(v) = map.get(*key) {
                subset.insert((*key).to_string(), v.clone());
            }
        }
    }
    Value::Object(subset)
}

/// Compute the SHA-256 fingerprint of a configuration's content-only
/// subset, hex-encoded.
#[must_use]
pub fn fingerprint(full: &Value) -> String {
    fingerprint_content_only(&content_only_subset(full))
}

/// Compute the SHA-256 fingerprint directly from an already-extracted
/// content-only value (used when the caller has pre-extracted the subset).
#[must_use]
pub fn fingerprint_content_only(content_only: &Value) -> String {
    let bytes = canonical_bytes(content_only);
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

/// Whether `fp` looks like a production fingerprint: 64 lowercase hex
/// characters, and not a test/descriptive prefix.
#[must_use]
pub fn is_production_fingerprint(fp: &str) -> bool {
    const TEST_PREFIXES: &[&str] = &["test-", "dev-", "staging-"];
    if TEST_PREFIXES.iter().any(|prefix| fp.starts_with(prefix)) {
        return false;
    }
    fp.len() == 64 && fp.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_excludes_volatile_fields() {
        let a = json!({"config_hash": "h", "last_offset": 3, "config_details": {"x": 1}, "updated_at": "t1"});
        let b = json!({"config_hash": "h", "last_offset": 3, "config_details": {"x": 1}, "updated_at": "t2"});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = json!({"config_hash": "h", "last_offset": 3, "config_details": {"x": 1}});
        let b = json!({"config_hash": "h", "last_offset": 4, "config_details": {"x": 1}});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn production_fingerprint_classification() {
        let production = "a".repeat(64);
        assert!(is_production_fingerprint(&production));
        assert!(!is_production_fingerprint("test-abc"));
        assert!(!is_production_fingerprint("dev-123"));
        assert!(!is_production_fingerprint("staging-xyz"));
        assert!(!is_production_fingerprint("too-short"));
    }
}
