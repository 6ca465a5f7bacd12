//! The attestation collector: validates incoming signatures against a
//! frozen [`ValidatorSetSnapshot`], deduplicates, and aggregates.

use crate::error::AttestationError;
use crate::snapshot::ValidatorSetSnapshot;
use crate::types::{AggregatedAttestation, Attestation, Scheme};
use certen_types::{Hash, PublicKey, Signature, SignerBitfield, ValidatorId, VotePower};
use std::collections::HashSet;
use tracing::warn;

/// Collects attestations toward one aggregation target (a batch root or a
/// governance outcome hash) over one fixed snapshot and scheme.
pub struct AttestationCollector<'a> {
    snapshot: &'a ValidatorSetSnapshot,
    scheme: Scheme,
    message_hash: Hash,
    attestations: Vec<Attestation>,
    seen: HashSet<ValidatorId>,
    poisoned: bool,
}

impl<'a> AttestationCollector<'a> {
    /// Start a new collection against `snapshot` for attestations over
    /// `message_hash`, using `scheme`.
    pub fn new(snapshot: &'a ValidatorSetSnapshot, scheme: Scheme, message_hash: Hash) -> Self {
        Self {
            snapshot,
            scheme,
            message_hash,
            attestations: Vec::new(),
            seen: HashSet::new(),
            poisoned: false,
        }
    }

    /// Number of distinct validators that have attested so far.
    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    /// Whether no attestations have been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }

    /// Submit one attestation.
    ///
    /// Validated against the snapshot: the presenter must be a member, its
    /// public key must match the snapshot's record, its scheme must match
    /// this collection's scheme, and its signature must verify over its own
    /// claimed `message_hash`. A submission whose `message_hash` diverges
    /// from the collection's target poisons the whole aggregation rather
    /// than being silently dropped (spec §4.F fail-closed). Duplicate
    /// submissions from an already-seen validator are a no-op.
    pub fn submit(&mut self, attestation: Attestation) -> Result<(), AttestationError> {
        let entry = self
            .snapshot
            .find(attestation.validator_id)
            .ok_or_else(|| {
                AttestationError::Invalid(format!(
                    "validator {} is not a member of this snapshot",
                    attestation.validator_id
                ))
            })?;

        if entry.public_key != attestation.public_key {
            return Err(AttestationError::Invalid(format!(
                "public key mismatch for validator {}",
                attestation.validator_id
            )));
        }
        if attestation.scheme != self.scheme {
            return Err(AttestationError::Invalid(format!(
                "validator {} attested with the wrong scheme",
                attestation.validator_id
            )));
        }
        if !attestation
            .public_key
            .verify(attestation.message_hash.as_bytes(), &attestation.signature)
        {
            return Err(AttestationError::Invalid(format!(
                "signature verification failed for validator {}",
                attestation.validator_id
            )));
        }

        if attestation.message_hash != self.message_hash {
            warn!(
                validator_id = %attestation.validator_id,
                "message hash mismatch; poisoning aggregation"
            );
            self.poisoned = true;
        }

        if !self.seen.insert(attestation.validator_id) {
            return Ok(());
        }
        self.attestations.push(attestation);
        Ok(())
    }

    /// Aggregate everything submitted so far.
    ///
    /// Returns `message_consistency_valid = false` and `threshold_met =
    /// false` if any submission poisoned the collection, regardless of
    /// accumulated weight.
    pub fn aggregate(&self) -> Result<AggregatedAttestation, AttestationError> {
        let total_weight = self.snapshot.total_weight();
        let participants: Vec<ValidatorId> =
            self.attestations.iter().map(|a| a.validator_id).collect();
        let achieved_weight: u64 = self.attestations.iter().map(|a| a.weight).sum();

        let mut bitfield = SignerBitfield::new(self.snapshot.len());
        for validator_id in &participants {
            if let Some(entry) = self.snapshot.find(*validator_id) {
                bitfield.set(entry.index);
            }
        }

        let threshold_weight = (total_weight * 2 / 3) + 1;

        if self.poisoned {
            return Ok(AggregatedAttestation {
                scheme: self.scheme,
                message_hash: self.message_hash,
                participants,
                participant_count: self.attestations.len(),
                bitfield,
                total_weight,
                achieved_weight,
                threshold_weight,
                threshold_met: false,
                message_consistency_valid: false,
                aggregate_signature: None,
                aggregate_public_key: None,
            });
        }

        let threshold_met = VotePower::has_quorum(achieved_weight, total_weight);

        let (aggregate_signature, aggregate_public_key) = match self.scheme {
            Scheme::Bls12381 => {
                if self.attestations.is_empty() {
                    (None, None)
                } else {
                    let sigs: Vec<Signature> =
                        self.attestations.iter().map(|a| a.signature.clone()).collect();
                    let pks: Vec<PublicKey> =
                        self.attestations.iter().map(|a| a.public_key.clone()).collect();
                    let agg_sig = Signature::aggregate_bls(&sigs)
                        .map_err(|e| AttestationError::Malformed(format!("BLS signature aggregation: {e}")))?;
                    let agg_pk = PublicKey::aggregate_bls(&pks)
                        .map_err(|e| AttestationError::Malformed(format!("BLS key aggregation: {e}")))?;
                    if !agg_pk.verify(self.message_hash.as_bytes(), &agg_sig) {
                        return Err(AttestationError::Malformed(
                            "aggregate BLS signature failed to verify".into(),
                        ));
                    }
                    (Some(agg_sig), Some(agg_pk))
                }
            }
            Scheme::Ed25519 => (None, None),
        };

        Ok(AggregatedAttestation {
            scheme: self.scheme,
            message_hash: self.message_hash,
            participants,
            participant_count: self.attestations.len(),
            bitfield,
            total_weight,
            achieved_weight,
            threshold_weight,
            threshold_met,
            message_consistency_valid: true,
            aggregate_signature,
            aggregate_public_key,
        })
    }

    /// Aggregate and require that quorum was reached; otherwise
    /// [`AttestationError::Threshold`].
    pub fn finalize(&self) -> Result<AggregatedAttestation, AttestationError> {
        let aggregated = self.aggregate()?;
        if !aggregated.threshold_met {
            return Err(AttestationError::Threshold(format!(
                "achieved weight {} of {} below quorum (threshold {})",
                aggregated.achieved_weight, aggregated.total_weight, aggregated.threshold_weight
            )));
        }
        Ok(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::batch_attestation_message;
    use crate::snapshot::ValidatorEntry;
    use certen_types::{KeyPair, VotePower};

    struct Fixture {
        snapshot: ValidatorSetSnapshot,
        keypairs: Vec<(ValidatorId, KeyPair)>,
        message_hash: Hash,
    }

    fn fixture(weights: &[u64], scheme: Scheme) -> Fixture {
        let mut entries = Vec::new();
        let mut keypairs = Vec::new();
        for &w in weights {
            let kp = match scheme {
                Scheme::Bls12381 => KeyPair::generate_bls(),
                Scheme::Ed25519 => KeyPair::generate_ed25519(),
            };
            let validator_id = ValidatorId::from_uuid(uuid::Uuid::new_v4());
            entries.push(ValidatorEntry {
                validator_id,
                public_key: kp.public_key(),
                weight: VotePower::new(w),
                index: 0,
            });
            keypairs.push((validator_id, kp));
        }
        let snapshot = ValidatorSetSnapshot::new(entries).unwrap();
        let message_hash = batch_attestation_message(
            &Hash::from_bytes(b"root"),
            "8453",
            12,
            100,
            &snapshot.snapshot_hash,
        );
        Fixture {
            snapshot,
            keypairs,
            message_hash,
        }
    }

    fn attest(fx: &Fixture, idx: usize, scheme: Scheme) -> Attestation {
        let (validator_id, kp) = &fx.keypairs[idx];
        let entry = fx.snapshot.find(*validator_id).unwrap();
        Attestation {
            scheme,
            validator_id: *validator_id,
            public_key: kp.public_key(),
            message_hash: fx.message_hash,
            signature: kp.sign(fx.message_hash.as_bytes()),
            weight: entry.weight.get(),
        }
    }

    #[test]
    fn bls_quorum_at_the_boundary() {
        // scenario seed: weights [40,30,20,10], total 100
        let fx = fixture(&[40, 30, 20, 10], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        collector.submit(attest(&fx, 0, Scheme::Bls12381)).unwrap();
        collector.submit(attest(&fx, 1, Scheme::Bls12381)).unwrap();

        let agg = collector.aggregate().unwrap();
        assert_eq!(agg.achieved_weight, 70);
        assert!(agg.threshold_met);
        assert!(agg.aggregate_signature.is_some());
        assert!(agg
            .aggregate_public_key
            .as_ref()
            .unwrap()
            .verify(fx.message_hash.as_bytes(), agg.aggregate_signature.as_ref().unwrap()));
    }

    #[test]
    fn bls_below_quorum_after_removing_a_validator() {
        let fx = fixture(&[40, 30, 20, 10], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        collector.submit(attest(&fx, 0, Scheme::Bls12381)).unwrap();

        let agg = collector.aggregate().unwrap();
        assert_eq!(agg.achieved_weight, 40);
        assert!(!agg.threshold_met);
        assert!(matches!(collector.finalize(), Err(AttestationError::Threshold(_))));
    }

    #[test]
    fn ed25519_collects_without_aggregating() {
        let fx = fixture(&[50, 50], Scheme::Ed25519);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Ed25519, fx.message_hash);
        collector.submit(attest(&fx, 0, Scheme::Ed25519)).unwrap();
        collector.submit(attest(&fx, 1, Scheme::Ed25519)).unwrap();

        let agg = collector.aggregate().unwrap();
        assert!(agg.threshold_met);
        assert!(agg.aggregate_signature.is_none());
        assert_eq!(agg.participant_count, 2);
        assert_eq!(agg.bitfield.count_ones(), 2);
    }

    #[test]
    fn duplicate_submission_does_not_double_count() {
        let fx = fixture(&[50, 50], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        let att = attest(&fx, 0, Scheme::Bls12381);
        collector.submit(att.clone()).unwrap();
        collector.submit(att).unwrap();

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.aggregate().unwrap().achieved_weight, 50);
    }

    #[test]
    fn rejects_non_member_validator() {
        let fx = fixture(&[50, 50], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        let kp = KeyPair::generate_bls();
        let bogus = Attestation {
            scheme: Scheme::Bls12381,
            validator_id: ValidatorId::from_uuid(uuid::Uuid::new_v4()),
            public_key: kp.public_key(),
            message_hash: fx.message_hash,
            signature: kp.sign(fx.message_hash.as_bytes()),
            weight: 50,
        };
        assert!(matches!(collector.submit(bogus), Err(AttestationError::Invalid(_))));
    }

    #[test]
    fn rejects_signature_that_fails_verification() {
        let fx = fixture(&[50, 50], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        let mut att = attest(&fx, 0, Scheme::Bls12381);
        att.signature = fx.keypairs[1].1.sign(fx.message_hash.as_bytes());
        assert!(matches!(collector.submit(att), Err(AttestationError::Invalid(_))));
    }

    #[test]
    fn message_mismatch_poisons_the_whole_aggregation() {
        let fx = fixture(&[50, 50], Scheme::Bls12381);
        let mut collector = AttestationCollector::new(&fx.snapshot, Scheme::Bls12381, fx.message_hash);
        collector.submit(attest(&fx, 0, Scheme::Bls12381)).unwrap();

        let (validator_id, kp) = &fx.keypairs[1];
        let other_hash = Hash::from_bytes(b"different target");
        let entry = fx.snapshot.find(*validator_id).unwrap();
        let poisoning = Attestation {
            scheme: Scheme::Bls12381,
            validator_id: *validator_id,
            public_key: kp.public_key(),
            message_hash: other_hash,
            signature: kp.sign(other_hash.as_bytes()),
            weight: entry.weight.get(),
        };
        collector.submit(poisoning).unwrap();

        let agg = collector.aggregate().unwrap();
        assert!(!agg.message_consistency_valid);
        assert!(!agg.threshold_met);
    }
}
