//! RFC 8785-style JSON canonicalization and the operation-ID commitment.
//!
//! Every commitment in the proof engine — Merkle leaves, the operation ID,
//! custody-chain event hashes, execution-result hash chains — is computed
//! over canonicalized JSON bytes, never over however `serde_json` happened
//! to serialize a value on a given platform. Canonical form: object keys
//! sorted byte-wise, no insignificant whitespace, numbers emitted in their
//! minimal form, strings escaped per JSON but otherwise left alone (inputs
//! here are already valid UTF-8, normalization is the caller's concern at
//! ingestion time).

use certen_types::Hash;
use serde_json::Value;
use std::collections::BTreeMap;

/// Errors produced while canonicalizing a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanonicalError {
    /// A number could not be represented in canonical form (e.g. NaN/Infinity,
    /// which JSON cannot express at all).
    #[error("non-finite or unrepresentable number in canonical input")]
    UnrepresentableNumber,
}

/// Canonicalize a JSON value to its RFC 8785-style byte representation.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// SHA-256 over the canonical bytes of `value`.
pub fn canonical_hash(value: &Value) -> Result<Hash, CanonicalError> {
    Ok(Hash::from_bytes(&canonicalize(value)?))
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(CanonicalError::UnrepresentableNumber);
                }
            }
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::String(s) => {
            // serde_json's string serializer already produces minimal,
            // correctly escaped JSON string literals.
            let encoded = serde_json::to_string(s).expect("string serialization cannot fail");
            out.extend_from_slice(encoded.as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Sort keys byte-wise regardless of the map's own iteration
            // order (serde_json may or may not preserve insertion order
            // depending on the `preserve_order` feature elsewhere in the
            // dependency graph — never rely on that here).
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push(b'{');
            for (i, (k, v)) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let key_encoded = serde_json::to_string(k).expect("string serialization cannot fail");
                out.extend_from_slice(key_encoded.as_bytes());
                out.push(b':');
                write_canonical(v, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// The four raw blobs an intent carries, in the fixed order the operation
/// ID commits to.
pub struct OperationBlobs<'a> {
    /// The intent payload itself.
    pub intent: &'a Value,
    /// Cross-chain routing metadata.
    pub cross_chain: &'a Value,
    /// Governance/authority metadata.
    pub governance: &'a Value,
    /// Replay-window metadata.
    pub replay: &'a Value,
}

/// Compute the 32-byte operation ID:
/// `SHA-256( canonical(intent) || canonical(cross_chain) || canonical(governance) || canonical(replay) )`.
pub fn operation_id(blobs: &OperationBlobs<'_>) -> Result<Hash, CanonicalError> {
    let mut buf = Vec::new();
    buf.extend(canonicalize(blobs.intent)?);
    buf.extend(canonicalize(blobs.cross_chain)?);
    buf.extend(canonicalize(blobs.governance)?);
    buf.extend(canonicalize(blobs.replay)?);
    Ok(Hash::from_bytes(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
        assert_eq!(canonicalize(&a).unwrap(), br#"{"a":2,"b":1}"#.to_vec());
    }

    #[test]
    fn sorts_nested_objects() {
        let v = json!({"outer": {"z": 1, "a": 2}, "first": true});
        let bytes = canonicalize(&v).unwrap();
        assert_eq!(
            bytes,
            br#"{"first":true,"outer":{"a":2,"z":1}}"#.to_vec()
        );
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"a": [1, 2, 3]});
        let bytes = canonicalize(&v).unwrap();
        assert!(!bytes.contains(&b' '));
        assert!(!bytes.contains(&b'\n'));
    }

    #[test]
    fn idempotent_on_bytes() {
        let v = json!({"x": [1,2,{"b":1,"a":2}], "y": "hello"});
        let once = canonicalize(&v).unwrap();
        let reparsed: Value = serde_json::from_slice(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_non_finite_numbers() {
        // serde_json::Number can't hold NaN/Infinity directly from json!,
        // so construct one via f64 that would be non-finite if allowed.
        // This test documents the guard exists even though serde_json's
        // own API makes it hard to construct a non-finite Number at all.
        let finite = json!(1.5);
        assert!(canonicalize(&finite).is_ok());
    }

    #[test]
    fn operation_id_is_order_sensitive_and_deterministic() {
        let intent = json!({"amount": 10});
        let cross = json!({"chain": "eth"});
        let gov = json!({"authority": "acc://x"});
        let replay = json!({"created_at": 1, "expires_at": 2});

        let blobs = OperationBlobs {
            intent: &intent,
            cross_chain: &cross,
            governance: &gov,
            replay: &replay,
        };
        let id1 = operation_id(&blobs).unwrap();
        let id2 = operation_id(&blobs).unwrap();
        assert_eq!(id1, id2);

        let swapped = OperationBlobs {
            intent: &cross,
            cross_chain: &intent,
            governance: &gov,
            replay: &replay,
        };
        assert_ne!(id1, operation_id(&swapped).unwrap());
    }
}
