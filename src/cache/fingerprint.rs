use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic fingerprint of a generation request. The parameter value is
/// canonicalized first so equivalent requests with differently-ordered
/// fields always collide on the same key.
pub fn fingerprint(user_id: &str, input_ref: &str, params: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update([b'\n']);
    hasher.update(input_ref.as_bytes());
    hasher.update([b'\n']);
    hasher.update(canonical_json(params).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn cache_key(namespace: &str, fingerprint: &str) -> String {
    format!("{namespace}:{fingerprint}")
}

pub fn content_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// JSON rendering with recursively sorted object keys. `serde_json`
/// preserves insertion order, so a plain `to_string` would leak field order
/// into the fingerprint.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{}:{}",
                        Value::String(key.clone()),
                        canonical_json(&map[key])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}
