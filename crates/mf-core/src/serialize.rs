// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON serialization and content hashing (spec invariant 7).
//!
//! `serde_json::Value`'s object map is a `BTreeMap` (this workspace does not
//! enable the `preserve_order` feature), so converting through [`Value`]
//! already sorts keys lexicographically at every depth; [`serialize_stable`]
//! only has to ensure numbers format consistently, which `serde_json`'s
//! `ryu`-backed float formatter already guarantees.

use mf_error::{MfError, MfErrorCode, MfResult};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Produce the canonical JSON string for any serializable value: object keys
/// sorted lexicographically at every depth, stable number formatting.
pub fn serialize_stable<T: Serialize>(value: &T) -> MfResult<String> {
    let v: Value = serde_json::to_value(value)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("failed to serialize: {e}")))?;
    serde_json::to_string(&v)
        .map_err(|e| MfError::new(MfErrorCode::InvalidProject, format!("failed to serialize: {e}")))
}

/// Parse raw bytes as JSON, rejecting oversize input before attempting to
/// parse it.
///
/// # Errors
///
/// - [`MfErrorCode::MaxJsonBytes`] if `json.len() > max_bytes`.
/// - [`MfErrorCode::InvalidJson`] if the bytes do not parse as JSON.
pub fn parse(json: &str, max_bytes: usize) -> MfResult<Value> {
    if json.len() > max_bytes {
        return Err(MfError::new(
            MfErrorCode::MaxJsonBytes,
            format!("input is {} bytes, exceeding the {max_bytes} byte limit", json.len()),
        )
        .with_context("bytes", json.len())
        .with_context("maxBytes", max_bytes));
    }
    serde_json::from_str(json)
        .map_err(|e| MfError::new(MfErrorCode::InvalidJson, format!("invalid JSON: {e}")))
}

/// Hex-encoded SHA-256 of raw bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A content-addressed project id: `mf_` followed by the first 8 hex
/// characters of the SHA-256 of the project's canonical JSON.
#[must_use]
pub fn project_id(canonical_json: &str) -> String {
    let full = sha256_hex(canonical_json.as_bytes());
    format!("mf_{}", &full[..8])
}

/// FNV-1a 32-bit hash, used for content-keyed identifiers (e.g. plan ids)
/// where collisions across unrelated seeds are an acceptable tradeoff for a
/// cheap, dependency-free hash (spec §3, `Plan.planId`).
#[must_use]
pub fn fnv1a_hex(bytes: &[u8]) -> String {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    format!("h{hash:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_stable_sorts_keys_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": 1, "y": 2}});
        let s = serialize_stable(&value).unwrap();
        assert_eq!(s, r#"{"a":{"y":2,"z":1},"b":1}"#);
    }

    #[test]
    fn serialize_stable_is_deterministic() {
        let value = json!({"objects": [{"id": "b"}, {"id": "a"}]});
        let s1 = serialize_stable(&value).unwrap();
        let s2 = serialize_stable(&value).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn parse_rejects_oversize_input() {
        let err = parse("{}", 1).unwrap_err();
        assert_eq!(err.code, MfErrorCode::MaxJsonBytes);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse("{not json", 1000).unwrap_err();
        assert_eq!(err.code, MfErrorCode::InvalidJson);
    }

    #[test]
    fn project_id_is_stable_and_prefixed() {
        let id1 = project_id("{}");
        let id2 = project_id("{}");
        assert_eq!(id1, id2);
        assert!(id1.starts_with("mf_"));
        assert_eq!(id1.len(), 11);
    }

    #[test]
    fn fnv1a_is_stable_and_prefixed() {
        let h1 = fnv1a_hex(b"seed-data");
        let h2 = fnv1a_hex(b"seed-data");
        assert_eq!(h1, h2);
        assert!(h1.starts_with('h'));
        assert_eq!(h1.len(), 9);
    }

    #[test]
    fn fnv1a_differs_for_different_input() {
        assert_ne!(fnv1a_hex(b"a"), fnv1a_hex(b"b"));
    }
}
