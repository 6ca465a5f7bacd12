//! The top-level persisted record and its lifecycle (spec §3 `ProofArtifact`).

use crate::error::OrchestratorError;
use certen_types::{AnchorId, BatchId, Hash, ProofId};
use serde::{Deserialize, Serialize};

/// A proof's lifecycle status. Statuses never move backward; `Failed` is
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Created,
    Batched,
    Anchored,
    Attested,
    Verified,
    Failed,
}

impl ArtifactStatus {
    /// Whether `self` is a terminal status (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, ArtifactStatus::Verified | ArtifactStatus::Failed)
    }

    /// Short identifier used in the `proof_artifacts.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Created => "created",
            ArtifactStatus::Batched => "batched",
            ArtifactStatus::Anchored => "anchored",
            ArtifactStatus::Attested => "attested",
            ArtifactStatus::Verified => "verified",
            ArtifactStatus::Failed => "failed",
        }
    }

    /// Parse a status back from its stored column value.
    pub fn from_str(s: &str) -> Result<Self, OrchestratorError> {
        match s {
            "created" => Ok(ArtifactStatus::Created),
            "batched" => Ok(ArtifactStatus::Batched),
            "anchored" => Ok(ArtifactStatus::Anchored),
            "attested" => Ok(ArtifactStatus::Attested),
            "verified" => Ok(ArtifactStatus::Verified),
            "failed" => Ok(ArtifactStatus::Failed),
            other => Err(OrchestratorError::Malformed(format!(
                "unknown artifact status {other:?}"
            ))),
        }
    }

    /// Validate a proposed transition against the forward-only lifecycle
    /// `created -> batched -> anchored -> attested -> verified`, with
    /// `failed` reachable from any non-terminal predecessor (spec §3).
    pub fn validate_transition(self, next: ArtifactStatus) -> Result<(), OrchestratorError> {
        if self.is_terminal() {
            return Err(OrchestratorError::Invalid(format!(
                "artifact is already in terminal status {self:?}, cannot move to {next:?}"
            )));
        }
        let allowed = match (self, next) {
            (ArtifactStatus::Created, ArtifactStatus::Batched) => true,
            (ArtifactStatus::Batched, ArtifactStatus::Anchored) => true,
            (ArtifactStatus::Anchored, ArtifactStatus::Attested) => true,
            (ArtifactStatus::Attested, ArtifactStatus::Verified) => true,
            (_, ArtifactStatus::Failed) => true,
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(OrchestratorError::Invalid(format!(
                "illegal transition {self:?} -> {next:?}"
            )))
        }
    }
}

/// The immutable and mutable halves of a persisted proof artifact (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofArtifact {
    /// Unique identifier. Immutable.
    pub proof_id: ProofId,
    /// A short discriminator, e.g. `"chained_anchor"` or `"governance"`.
    /// Immutable.
    pub proof_type: String,
    /// Schema version of `artifact_json`'s shape. Immutable.
    pub proof_version: u32,
    /// The source transaction this proof is for. Immutable.
    pub source_tx_hash: Hash,
    /// The full canonicalized proof payload (L1-L3 and/or governance).
    /// Immutable once written.
    pub artifact_json: serde_json::Value,
    /// `SHA-256(artifact_json)`, recomputed and checked on every read
    /// (spec §8 universal invariant).
    pub artifact_hash: Hash,
    /// Current lifecycle status. Mutated only by the lifecycle orchestrator.
    pub status: ArtifactStatus,
    /// The batch this artifact was committed into, once batched.
    pub batch_id: Option<BatchId>,
    /// The anchor this artifact's batch was submitted under, once anchored.
    pub anchor_id: Option<AnchorId>,
    /// Unix-seconds creation time.
    pub created_at: i64,
    /// Unix-seconds of the most recent status transition.
    pub updated_at: i64,
}

impl ProofArtifact {
    /// Construct a new artifact in `Created` status, hashing `artifact_json`
    /// with the canonicalization the spec's invariant requires.
    pub fn new(
        proof_type: impl Into<String>,
        proof_version: u32,
        source_tx_hash: Hash,
        artifact_json: serde_json::Value,
        now: i64,
    ) -> Result<Self, OrchestratorError> {
        let bytes = certen_canonical::canonicalize(&artifact_json).map_err(|e| {
            OrchestratorError::Malformed(format!("artifact_json does not canonicalize: {e}"))
        })?;
        Ok(Self {
            proof_id: ProofId::new(),
            proof_type: proof_type.into(),
            proof_version,
            source_tx_hash,
            artifact_json,
            artifact_hash: Hash::from_bytes(&bytes),
            status: ArtifactStatus::Created,
            batch_id: None,
            anchor_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Recompute `SHA-256(artifact_json)` and compare against the stored
    /// `artifact_hash` (spec §8 universal invariant).
    pub fn verify_hash(&self) -> Result<(), OrchestratorError> {
        let bytes = certen_canonical::canonicalize(&self.artifact_json).map_err(|e| {
            OrchestratorError::Malformed(format!("artifact_json does not canonicalize: {e}"))
        })?;
        if Hash::from_bytes(&bytes) != self.artifact_hash {
            return Err(OrchestratorError::Malformed(format!(
                "artifact {} hash mismatch",
                self.proof_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forward_transitions_are_allowed_in_order() {
        let mut s = ArtifactStatus::Created;
        for next in [
            ArtifactStatus::Batched,
            ArtifactStatus::Anchored,
            ArtifactStatus::Attested,
            ArtifactStatus::Verified,
        ] {
            s.validate_transition(next).unwrap();
            s = next;
        }
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        for s in [
            ArtifactStatus::Created,
            ArtifactStatus::Batched,
            ArtifactStatus::Anchored,
            ArtifactStatus::Attested,
        ] {
            s.validate_transition(ArtifactStatus::Failed).unwrap();
        }
    }

    #[test]
    fn terminal_states_reject_any_further_transition() {
        assert!(ArtifactStatus::Verified
            .validate_transition(ArtifactStatus::Batched)
            .is_err());
        assert!(ArtifactStatus::Failed
            .validate_transition(ArtifactStatus::Batched)
            .is_err());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert!(ArtifactStatus::Created
            .validate_transition(ArtifactStatus::Anchored)
            .is_err());
    }

    #[test]
    fn status_never_moves_backward() {
        assert!(ArtifactStatus::Anchored
            .validate_transition(ArtifactStatus::Batched)
            .is_err());
    }

    #[test]
    fn new_artifact_hash_matches_and_verifies() {
        let artifact = ProofArtifact::new(
            "chained_anchor",
            1,
            Hash::from_bytes(b"tx"),
            json!({"l1": "..."}),
            1_700_000_000,
        )
        .unwrap();
        artifact.verify_hash().unwrap();
    }

    #[test]
    fn tampered_artifact_fails_hash_verification() {
        let mut artifact = ProofArtifact::new(
            "chained_anchor",
            1,
            Hash::from_bytes(b"tx"),
            json!({"l1": "..."}),
            1_700_000_000,
        )
        .unwrap();
        artifact.artifact_json = json!({"l1": "tampered"});
        assert!(artifact.verify_hash().is_err());
    }
}
