//! Content fingerprints for change detection.
//!
//! A fingerprint is the SHA-256 of the canonical JSON form of a payload:
//! object keys sorted at every level, no insignificant whitespace. Two
//! payloads that differ only in key order get the same fingerprint.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a canonicalized JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(value: &Value) -> Self {
        let canonical = canonicalize(value).to_string();
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell snapshots apart in logs
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Rebuild `value` with object keys in sorted order.
///
/// `serde_json::Map` only sorts keys when the `preserve_order` feature is
/// off, and any crate in the build can turn it on, so sort explicitly.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
