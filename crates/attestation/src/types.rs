//! Attestation and aggregation records (spec §3).

use certen_types::{Hash, PublicKey, Signature, SignerBitfield, ValidatorId};
use serde::{Deserialize, Serialize};

/// Which signature scheme an attestation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// BLS12-381: aggregatable.
    Bls12381,
    /// Ed25519: collected individually, never aggregated.
    Ed25519,
}

/// A single validator's signature over an aggregation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// Signature scheme used.
    pub scheme: Scheme,
    /// The attesting validator.
    pub validator_id: ValidatorId,
    /// The validator's public key, as of the referenced snapshot.
    pub public_key: PublicKey,
    /// The message hash this attestation signs.
    pub message_hash: Hash,
    /// The signature itself.
    pub signature: Signature,
    /// This validator's stake weight in the referenced snapshot.
    pub weight: u64,
}

/// The result of collecting attestations for one target (a batch root or a
/// governance outcome hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedAttestation {
    /// Signature scheme of every constituent attestation.
    pub scheme: Scheme,
    /// The message hash every attestation must share.
    pub message_hash: Hash,
    /// Validator IDs that contributed, in submission order.
    pub participants: Vec<ValidatorId>,
    /// `participants.len()`.
    pub participant_count: usize,
    /// Which snapshot indices attested.
    pub bitfield: SignerBitfield,
    /// Total weight across the whole snapshot.
    pub total_weight: u64,
    /// Weight contributed by `participants`.
    pub achieved_weight: u64,
    /// Minimum weight required for quorum, given `total_weight`.
    pub threshold_weight: u64,
    /// Whether `achieved_weight` reached `threshold_weight`.
    pub threshold_met: bool,
    /// `false` if any constituent attestation's `message_hash` diverged —
    /// poisons the whole aggregation regardless of weight (spec §4.F).
    pub message_consistency_valid: bool,
    /// BLS only: the aggregated G2 signature.
    pub aggregate_signature: Option<Signature>,
    /// BLS only: the aggregated G1 public key of `participants`.
    pub aggregate_public_key: Option<PublicKey>,
}
