use crate::document::Document;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

const SYNTHETIC_PREFIX: &str = "__synthetic__:";

/// Resolve the identity of `document` for the dotted `key_path`
/// (`metadata.name`).
///
/// The path is walked as nested map lookups. If a segment is missing, an
/// intermediate value is not a map, or the final value is not a string, number
/// or bool, the identity falls back to [synthetic_identity]. This never fails.
///
/// Collisions between documents are not handled here; see
/// [Engine::compare](crate::Engine::compare).
pub fn resolve(document: &Document, key_path: &str) -> String {
    match find_value(&document.content, key_path).and_then(scalar_identity) {
        Some(identity) => identity,
        None => {
            let identity = synthetic_identity(&document.content);
            debug!(
                key_path,
                identity = %identity,
                "identity key missing or not a scalar, using synthetic identity"
            );
            identity
        }
    }
}

/// A stable identity derived from a digest of the whole document. Equal
/// content always yields the same identity.
pub fn synthetic_identity(content: &Value) -> String {
    // serde_json maps iterate in key order, so this serialization is canonical
    let canonical = serde_json::to_string(content).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}{}", SYNTHETIC_PREFIX, &digest[..16])
}

pub fn is_synthetic(identity: &str) -> bool {
    identity.starts_with(SYNTHETIC_PREFIX)
}

fn find_value<'a>(resource: &'a Value, key_path: &str) -> Option<&'a Value> {
    key_path
        .split('.')
        .try_fold(resource, |r, key| r.as_object()?.get(key))
}

fn scalar_identity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
