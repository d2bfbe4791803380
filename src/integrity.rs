//! Canonical serialization and SHA-256 integrity hashes.
//!
//! The canonical form of a JSON value is compact JSON with object keys in
//! byte order at every depth. Numbers use `serde_json`'s shortest round-trip
//! rendering, so a float written by this crate and read back hashes to the
//! same bytes. The hash field itself is removed from the top-level object
//! before hashing.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Name of the hash field on persisted summary records.
pub const INTEGRITY_FIELD: &str = "integrity_hash";

/// Writes `value` in canonical form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of `value`'s canonical form with top-level `exclude` removed.
///
/// Non-object values are hashed whole.
pub fn hash_excluding(value: &Value, exclude: &str) -> String {
    match value {
        Value::Object(map) if map.contains_key(exclude) => {
            let mut stripped = map.clone();
            stripped.remove(exclude);
            sha256_hex(canonical_json(&Value::Object(stripped)).as_bytes())
        }
        other => sha256_hex(canonical_json(other).as_bytes()),
    }
}

/// Hash of any serializable record, skipping its [`INTEGRITY_FIELD`].
///
/// # Errors
///
/// Returns a JSON error if `record` cannot be represented as a JSON value.
pub fn record_hash<T: Serialize>(record: &T) -> Result<String> {
    let value = serde_json::to_value(record)?;
    Ok(hash_excluding(&value, INTEGRITY_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_at_every_depth() {
        let v = json!({"b": 1, "a": {"z": true, "y": [3, {"d": 0, "c": 1}]}});
        assert_eq!(
            canonical_json(&v),
            r#"{"a":{"y":[3,{"c":1,"d":0}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn key_order_does_not_change_hash() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": "two"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": "two", "x": 1}"#).unwrap();
        assert_eq!(hash_excluding(&a, "h"), hash_excluding(&b, "h"));
    }

    #[test]
    fn excluded_field_does_not_affect_hash() {
        let with = json!({"x": 1, "h": "anything"});
        let without = json!({"x": 1});
        assert_eq!(hash_excluding(&with, "h"), hash_excluding(&without, "h"));
    }

    #[test]
    fn float_round_trips_to_same_hash() {
        let original = json!({"avg": 0.96, "whole": 1.0});
        let text = serde_json::to_string(&original).unwrap();
        let reread: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(hash_excluding(&original, "h"), hash_excluding(&reread, "h"));
    }

    #[test]
    fn any_value_change_changes_hash() {
        let a = json!({"avg": 0.96, "n": 0});
        let b = json!({"avg": 0.960_000_001, "n": 0});
        let c = json!({"avg": 0.96, "n": 1});
        assert_ne!(hash_excluding(&a, "h"), hash_excluding(&b, "h"));
        assert_ne!(hash_excluding(&a, "h"), hash_excluding(&c, "h"));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
