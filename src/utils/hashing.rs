// file: src/utils/hashing.rs
// description: canonical json encoding and sha256 fingerprints
// reference: https://docs.rs/sha2

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Serializes a JSON value with object keys sorted at every depth, so two
/// values that compare equal always produce the same bytes.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> = map
                .iter()
                .map(|(k, v)| (k, to_canonical_json(v)))
                .collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", quote(k), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

pub fn hash_str(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn hash_value(value: &Value) -> String {
    hash_str(&to_canonical_json(value))
}
