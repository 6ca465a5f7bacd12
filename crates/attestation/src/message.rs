//! Domain-separated message construction for attestation signing (spec §4.F).
//!
//! Mirrors the teacher's `signing.rs` convention: one constant tag per
//! signable message type, folded into the message before hashing, so a
//! signature from one context can never be replayed as another.

use certen_canonical::canonical_hash;
use certen_types::{BatchId, Hash, ProofId};
use serde::Serialize;
use serde_json::json;

/// Domain tag folded into every batch-root attestation message.
pub const DOMAIN_BATCH_ATTESTATION: &[u8] = b"CERTEN_RESULT_ATTESTATION_V1";

/// Domain tag folded into every governance-outcome attestation message.
pub const DOMAIN_GOVERNANCE_ATTESTATION: &[u8] = b"CERTEN_GOVERNANCE_ATTESTATION_V1";

#[derive(Serialize)]
struct BatchAttestationPayload {
    batch_root: Hash,
    target_chain_id: String,
    required_confirmations: u64,
    observed_block_height: u64,
    snapshot_hash: Hash,
}

/// Build the message a validator signs to attest a batch's commitment to a
/// specific external-chain target, per spec §4.F: `SHA-256` over canonical
/// JSON of `{ batch_root, target_chain_id, required_confirmations,
/// observed_block_height, snapshot_hash }`, with the domain tag folded in
/// ahead of the payload bytes.
pub fn batch_attestation_message(
    batch_root: &Hash,
    target_chain_id: &str,
    required_confirmations: u64,
    observed_block_height: u64,
    snapshot_hash: &Hash,
) -> Hash {
    let payload = BatchAttestationPayload {
        batch_root: *batch_root,
        target_chain_id: target_chain_id.to_string(),
        required_confirmations,
        observed_block_height,
        snapshot_hash: *snapshot_hash,
    };
    let value = serde_json::to_value(&payload).expect("attestation payload always serializes");
    let payload_hash =
        canonical_hash(&value).expect("attestation payload always canonicalizes (no floats)");

    let mut buf = Vec::with_capacity(DOMAIN_BATCH_ATTESTATION.len() + 32);
    buf.extend_from_slice(DOMAIN_BATCH_ATTESTATION);
    buf.extend_from_slice(payload_hash.as_bytes());
    Hash::from_bytes(&buf)
}

/// Build the message a validator signs to attest a governance proof's
/// outcome hash. Not named explicitly in spec §4.F (which specifies the
/// batch-root message literally); grounded on the same domain-tag-then-hash
/// construction, applied to the second attestation target this engine's
/// governance layer produces.
pub fn governance_attestation_message(proof_id: &ProofId, outcome_hash: &Hash) -> Hash {
    let payload = json!({
        "proof_id": proof_id.as_uuid().to_string(),
        "outcome_hash": outcome_hash,
    });
    let payload_hash =
        canonical_hash(&payload).expect("governance attestation payload always canonicalizes");

    let mut buf = Vec::with_capacity(DOMAIN_GOVERNANCE_ATTESTATION.len() + 32);
    buf.extend_from_slice(DOMAIN_GOVERNANCE_ATTESTATION);
    buf.extend_from_slice(payload_hash.as_bytes());
    Hash::from_bytes(&buf)
}

/// Convenience re-export so call sites that only have a [`BatchId`] and no
/// target-chain context yet (e.g. unit tests) can still build a stable
/// per-batch identifier distinct from the full per-target message.
pub fn batch_identity_hash(batch_id: &BatchId) -> Hash {
    Hash::from_bytes(batch_id.as_uuid().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_message_is_deterministic() {
        let root = Hash::from_bytes(b"root");
        let snapshot_hash = Hash::from_bytes(b"snap");
        assert_eq!(
            batch_attestation_message(&root, "8453", 12, 100, &snapshot_hash),
            batch_attestation_message(&root, "8453", 12, 100, &snapshot_hash)
        );
    }

    #[test]
    fn different_domains_produce_different_messages() {
        let hash = Hash::from_bytes(b"same bytes");
        let batch_msg = batch_attestation_message(&hash, "8453", 12, 100, &hash);
        let gov_msg = governance_attestation_message(&ProofId::new(), &hash);
        assert_ne!(batch_msg, gov_msg);
    }

    #[test]
    fn differs_by_target_chain() {
        let root = Hash::from_bytes(b"root");
        let snapshot_hash = Hash::from_bytes(b"snap");
        let a = batch_attestation_message(&root, "8453", 12, 100, &snapshot_hash);
        let b = batch_attestation_message(&root, "solana-mainnet", 12, 100, &snapshot_hash);
        assert_ne!(a, b);
    }

    #[test]
    fn differs_by_observed_block_height() {
        let root = Hash::from_bytes(b"root");
        let snapshot_hash = Hash::from_bytes(b"snap");
        let a = batch_attestation_message(&root, "8453", 12, 100, &snapshot_hash);
        let b = batch_attestation_message(&root, "8453", 12, 101, &snapshot_hash);
        assert_ne!(a, b);
    }
}
