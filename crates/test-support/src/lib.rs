//! Fixture builders shared across this workspace's test suites.
//!
//! Grounded on the teacher's `hyperscale-test-helpers` crate: properly
//! signed fixtures rather than ad hoc mocks, so a test exercising signature
//! verification or quorum math exercises the real cryptographic paths.

use certen_attestation::{
    batch_attestation_message, Attestation, Scheme, ValidatorEntry, ValidatorSetSnapshot,
};
use certen_proof::{Intent, ProofClass};
use certen_types::{Hash, KeyPair, KeyType, ValidatorId, VotePower};
use serde_json::json;

/// Deterministic seed for the `n`th fixture validator, distinct across
/// `n` and key type so BLS and Ed25519 fixtures never collide.
fn seed_for(n: u8, key_type: KeyType) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0] = n;
    seed[31] = match key_type {
        KeyType::Ed25519 => 0xED,
        KeyType::Bls12381 => 0xB1,
    };
    seed
}

/// Build a validator set of `count` equally-weighted members signing with
/// `scheme`, plus the keypair for each (in snapshot order) so tests can
/// sign fixtures directly.
pub fn validator_set(count: u8, scheme: Scheme, weight: u64) -> (ValidatorSetSnapshot, Vec<KeyPair>) {
    let key_type = match scheme {
        Scheme::Bls12381 => KeyType::Bls12381,
        Scheme::Ed25519 => KeyType::Ed25519,
    };
    let mut keypairs = Vec::with_capacity(count as usize);
    let mut entries = Vec::with_capacity(count as usize);
    for n in 0..count {
        let keypair = KeyPair::from_seed(key_type, &seed_for(n, key_type));
        entries.push(ValidatorEntry {
            validator_id: ValidatorId::from_uuid(uuid::Uuid::new_v4()),
            public_key: keypair.public_key(),
            weight: VotePower::new(weight),
            index: 0,
        });
        keypairs.push(keypair);
    }
    let snapshot = ValidatorSetSnapshot::new(entries).expect("fixture validator set is non-empty");
    (snapshot, keypairs)
}

/// Sign a batch-root attestation message with every keypair in `keypairs`,
/// assuming they correspond 1:1 (by snapshot index) to `snapshot`.
pub fn sign_batch_attestations(
    snapshot: &ValidatorSetSnapshot,
    keypairs: &[KeyPair],
    scheme: Scheme,
    batch_root: &Hash,
    target_chain_id: &str,
    required_confirmations: u64,
    observed_block_height: u64,
) -> Vec<Attestation> {
    let message_hash = batch_attestation_message(
        batch_root,
        target_chain_id,
        required_confirmations,
        observed_block_height,
        &snapshot.snapshot_hash,
    );

    snapshot
        .validators
        .iter()
        .zip(keypairs.iter())
        .map(|(entry, keypair)| Attestation {
            scheme,
            validator_id: entry.validator_id,
            public_key: entry.public_key.clone(),
            message_hash,
            signature: keypair.sign(message_hash.as_bytes()),
            weight: entry.weight.get(),
        })
        .collect()
}

/// A minimal but well-formed discovered intent, routed on-cadence, for
/// exercising the proof-build and batch-collection paths end to end.
pub fn sample_intent(source_tx_hash: Hash, organization_id: &str) -> Intent {
    Intent {
        intent_blob: json!({"type": "send_tokens", "amount": "100"}),
        cross_chain_blob: json!({"target": "eth-mainnet"}),
        governance_blob: json!({"authority": "acc://fixture.acme/book"}),
        replay_blob: json!({"window_start": 0, "window_end": 3_600}),
        source_account_url: "acc://fixture.acme/tokens".to_string(),
        source_tx_hash,
        source_sub_partition: "bvn-fixture".to_string(),
        organization_id: organization_id.to_string(),
        proof_class: ProofClass::OnCadence,
    }
}

/// A fixture source-transaction hash derived deterministically from a
/// small integer, for tests that need many distinct but reproducible
/// hashes.
pub fn fixture_tx_hash(n: u64) -> Hash {
    Hash::from_bytes(format!("fixture-tx-{n}").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_set_fixture_signs_and_verifies() {
        let (snapshot, keypairs) = validator_set(4, Scheme::Bls12381, 25);
        let root = fixture_tx_hash(1);
        let attestations =
            sign_batch_attestations(&snapshot, &keypairs, Scheme::Bls12381, &root, "ethereum:1", 12, 100);
        assert_eq!(attestations.len(), 4);
        for attestation in &attestations {
            assert!(attestation
                .public_key
                .verify(attestation.message_hash.as_bytes(), &attestation.signature));
        }
    }

    #[test]
    fn sample_intent_computes_operation_id() {
        let intent = sample_intent(fixture_tx_hash(7), "acme-corp");
        assert!(intent.operation_id().is_ok());
    }
}
