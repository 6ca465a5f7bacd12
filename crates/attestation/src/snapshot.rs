//! The frozen validator set an aggregation is computed against.
//!
//! Grounded on the teacher's `topology::StaticTopology`: a fixed, ordered
//! validator list with per-member weight, looked up by ID rather than
//! re-derived from a live view, so an aggregation's bitfield indices stay
//! meaningful even if membership changes later.

use crate::error::AttestationError;
use certen_types::{Hash, PublicKey, ValidatorId, VotePower};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One validator's entry in a snapshot: its identity, key, weight, and
/// position in the snapshot's fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    /// Stable validator identity.
    pub validator_id: ValidatorId,
    /// The key this validator signs attestations with.
    pub public_key: PublicKey,
    /// Stake weight in this snapshot.
    pub weight: VotePower,
    /// Dense, zero-based position in [`ValidatorSetSnapshot::validators`].
    pub index: usize,
}

/// The validator set at a consensus height, frozen for the lifetime of every
/// aggregation that references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSetSnapshot {
    /// Ordered validator entries, `index` matching position.
    pub validators: Vec<ValidatorEntry>,
    /// Canonical-JSON digest of the snapshot's contents.
    pub snapshot_hash: Hash,
}

impl ValidatorSetSnapshot {
    /// Build a snapshot from an ordered validator list, assigning dense
    /// indices and computing the snapshot hash.
    pub fn new(mut validators: Vec<ValidatorEntry>) -> Result<Self, AttestationError> {
        if validators.is_empty() {
            return Err(AttestationError::Invalid(
                "validator set snapshot must have at least one member".into(),
            ));
        }
        for (i, entry) in validators.iter_mut().enumerate() {
            entry.index = i;
        }

        let payload = json!(validators
            .iter()
            .map(|v| json!({
                "validator_id": v.validator_id.as_uuid().to_string(),
                "public_key": format!("{:?}", v.public_key),
                "weight": v.weight.get(),
                "index": v.index,
            }))
            .collect::<Vec<_>>());
        let snapshot_hash = certen_canonical::canonical_hash(&payload)
            .map_err(|e| AttestationError::Malformed(format!("snapshot hash: {e}")))?;

        Ok(Self {
            validators,
            snapshot_hash,
        })
    }

    /// Total weight across all members.
    pub fn total_weight(&self) -> u64 {
        VotePower::sum(&self.validators.iter().map(|v| v.weight).collect::<Vec<_>>())
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the snapshot has no members. Rejected by [`Self::new`], kept
    /// for completeness / clippy parity.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Look up a member by validator ID.
    pub fn find(&self, validator_id: ValidatorId) -> Option<&ValidatorEntry> {
        self.validators.iter().find(|v| v.validator_id == validator_id)
    }

    /// Look up a member by its snapshot index.
    pub fn at(&self, index: usize) -> Option<&ValidatorEntry> {
        self.validators.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certen_types::KeyPair;

    fn entry(weight: u64) -> ValidatorEntry {
        let kp = KeyPair::generate_bls();
        ValidatorEntry {
            validator_id: ValidatorId::from_uuid(uuid::Uuid::new_v4()),
            public_key: kp.public_key(),
            weight: VotePower::new(weight),
            index: 0,
        }
    }

    #[test]
    fn assigns_dense_indices() {
        let snap = ValidatorSetSnapshot::new(vec![entry(40), entry(30), entry(30)]).unwrap();
        let indices: Vec<usize> = snap.validators.iter().map(|v| v.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn rejects_empty_set() {
        assert!(matches!(
            ValidatorSetSnapshot::new(vec![]),
            Err(AttestationError::Invalid(_))
        ));
    }

    #[test]
    fn total_weight_sums_members() {
        let snap = ValidatorSetSnapshot::new(vec![entry(40), entry(30), entry(20), entry(10)]).unwrap();
        assert_eq!(snap.total_weight(), 100);
    }

    #[test]
    fn snapshot_hash_is_deterministic() {
        let a = entry(40);
        let b = entry(30);
        let snap1 = ValidatorSetSnapshot::new(vec![a.clone(), b.clone()]).unwrap();
        let snap2 = ValidatorSetSnapshot::new(vec![a, b]).unwrap();
        assert_eq!(snap1.snapshot_hash, snap2.snapshot_hash);
    }

    #[test]
    fn find_looks_up_by_id() {
        let e = entry(40);
        let id = e.validator_id;
        let snap = ValidatorSetSnapshot::new(vec![e, entry(30)]).unwrap();
        assert_eq!(snap.find(id).unwrap().validator_id, id);
        assert!(snap.find(ValidatorId::from_uuid(uuid::Uuid::new_v4())).is_none());
    }
}
