//! Canonical JSON serialization helpers.
//!
//! Artifacts and metadata records are written with recursively sorted object
//! keys so that two runs over the same data produce byte-identical files and
//! the model hash is stable.

use serde::Serialize;
use serde_json::{map::Map, Value};

/// Recursively sort JSON object keys to obtain a canonical representation.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key, canonicalize(val));
            }

            Value::Object(sorted)
        }
        Value::Array(elements) => Value::Array(elements.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serialize a value to compact canonical JSON (sorted keys, no whitespace)
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    serde_json::to_string(&canonical)
}

/// Serialize a value to indented canonical JSON, for human-inspected records
pub fn to_canonical_json_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonicalize(serde_json::to_value(value)?);
    serde_json::to_string_pretty(&canonical)
}

/// Blake3 digest of the canonical JSON representation, hex encoded
pub fn hash_canonical_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = to_canonical_json(value)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Unordered {
        b_field: i64,
        a_field: i64,
        nested: HashMap<String, f64>,
    }

    fn sample() -> Unordered {
        let mut nested = HashMap::new();
        nested.insert("zeta".to_string(), 1.5);
        nested.insert("alpha".to_string(), 2.5);
        Unordered {
            b_field: 2,
            a_field: 1,
            nested,
        }
    }

    #[test]
    fn test_keys_are_sorted() {
        let json = to_canonical_json(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"a_field":1,"b_field":2,"nested":{"alpha":2.5,"zeta":1.5}}"#
        );
    }

    #[test]
    fn test_hash_is_stable() {
        let h1 = hash_canonical_hex(&sample()).unwrap();
        let h2 = hash_canonical_hex(&sample()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_pretty_output_is_still_sorted() {
        let json = to_canonical_json_pretty(&sample()).unwrap();
        let a = json.find("a_field").unwrap();
        let b = json.find("b_field").unwrap();
        assert!(a < b);
        assert!(json.contains('\n'));
    }
}
