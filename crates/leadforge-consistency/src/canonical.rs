//! Canonicalization for fingerprinting.
//!
//! Canonicalization (i) drops volatile keys, (ii) parses any string-embedded
//! JSON recursively before hashing, and (iii) uses a stable key ordering.

use serde_json::Value;
use std::collections::BTreeMap;

/// Keys dropped wherever they appear, at any nesting depth, because they are
/// volatile fields that must not influence a content fingerprint.
pub const VOLATILE_KEYS: &[&str] =
    &["updated_at", "created_at", "acquired_at", "expires_at"];

/// Canonicalize a JSON value for fingerprinting: drop volatile keys, recurse
/// into string-embedded JSON, and sort object keys.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (key, v) in map {
                if VOLATILE_KEYS.contains(&key.as_str()) {
                    continue;
                }
                sorted.insert(key.clone(), canonicalize(v));
            }
            let ordered: serde_json::Map<String, Value> = sorted.into_iter().collect();
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed) if parsed.is_object() || parsed.is_array() => canonicalize(&parsed),
            _ => Value::String(s.clone()),
        },
        other => other.clone(),
    }
}

/// Serialize a value to the canonical byte string that is hashed. Object
/// keys are already sorted by [`canonicalize`]; `serde_json`'s default
/// object representation (a `BTreeMap`-backed `Map` once built from one)
/// then serializes them in that order.
#[must_use]
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_volatile_keys_at_any_depth() {
        let value = json!({
            "config_hash": "abc",
            "updated_at": "2026-01-01T00:00:00Z",
            "nested": { "created_at": "x", "keep": 1 }
        });
        let canonical = canonicalize(&value);
        assert_eq!(canonical, json!({"config_hash": "abc", "nested": {"keep": 1}}));
    }

    #[test]
    fn sorts_object_keys() {
        let value = json!({"b": 1, "a": 2});
        let bytes = canonical_bytes(&value);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn recurses_into_string_embedded_json() {
        let value = json!({"payload": "{\"updated_at\":\"now\",\"x\":1}"});
        let canonical = canonicalize(&value);
        assert_eq!(canonical, json!({"payload": {"x": 1}}));
    }

    #[test]
    fn volatile_field_mutation_preserves_canonical_form() {
        let a = json!({"config_hash": "abc", "updated_at": "t1"});
        let b = json!({"config_hash": "abc", "updated_at": "t2"});
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }
}
