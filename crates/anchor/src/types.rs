//! Anchoring request/result types and the execution-result hash chain
//! (spec §3 `ChainExecutionResult`, §4.G hash-chain binding).

use crate::error::AnchorError;
use certen_canonical::canonicalize;
use certen_proof::GovernanceLevel;
use certen_types::{AnchorId, BatchId, Hash, ProofId, Signature};
use serde::{Deserialize, Serialize};

/// An external chain platform a strategy targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainPlatform {
    Ethereum,
    Solana,
    Cosmos,
}

impl ChainPlatform {
    /// Short identifier used in logs and the `chain_execution_results` rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainPlatform::Ethereum => "ethereum",
            ChainPlatform::Solana => "solana",
            ChainPlatform::Cosmos => "cosmos",
        }
    }
}

/// A request to register a new anchor on an external chain, carrying the
/// batch root it commits to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub batch_id: BatchId,
    pub merkle_root: Hash,
    pub tx_count: u32,
}

/// The governance-gated proof submission attached to an anchor, matching
/// the external contract's `proof` tuple: `(adiURL, anchorId, merkleProof[],
/// keyBookProof, roleProof, thresholdProof, timestamp, expiresAt,
/// validatorSignatures, nonce, requiredLevel)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceProofSubmission {
    pub adi_url: String,
    pub anchor_id: AnchorId,
    pub merkle_proof: Vec<Hash>,
    pub key_book_proof: Hash,
    pub role_proof: Hash,
    pub threshold_proof: Hash,
    pub timestamp: i64,
    pub expires_at: i64,
    pub validator_signatures: Vec<Signature>,
    pub nonce: u64,
    pub required_level: GovernanceLevel,
}

/// Parameters for a governance-gated execution call (`ExecuteWithGovernance`
/// / the contract's `executeWithGovernanceProof` and friends).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub target: String,
    pub value: u128,
    pub data: Vec<u8>,
    pub proof: GovernanceProofSubmission,
}

/// A batch-level anchor registration on one external platform (spec §4.H
/// `anchor_records`): the row `create_anchor` produces, tracked through to
/// confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub anchor_id: AnchorId,
    pub batch_id: BatchId,
    pub platform: ChainPlatform,
    pub tx_hash: String,
    pub status: AnchorRecordStatus,
}

/// Lifecycle of an `anchor_records` row, independent of the owning batch's
/// own status (spec §3 `Batch` lifecycle mirrors this at batch granularity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRecordStatus {
    Pending,
    Confirmed,
    Failed,
}

impl AnchorRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorRecordStatus::Pending => "pending",
            AnchorRecordStatus::Confirmed => "confirmed",
            AnchorRecordStatus::Failed => "failed",
        }
    }
}

/// One proof's governance-proof submission bound to an `anchor_records` row
/// (spec §4.H `anchor_references`): lets a proof's submission tx be looked
/// up independently of the batch-level anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReference {
    pub anchor_id: AnchorId,
    pub proof_id: ProofId,
    pub tx_hash: String,
}

/// Execution-result lifecycle status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Failed,
}

/// The fields of a [`ChainExecutionResult`] that participate in the hash
/// chain, excluding `result_hash` itself. Kept as a standalone struct so
/// `compute_result_hash` hashes exactly these fields and nothing else,
/// regardless of how the owning struct's field order or derives evolve.
#[derive(Debug, Clone, Serialize)]
struct ResultFields<'a> {
    proof_id: ProofId,
    chain_platform: ChainPlatform,
    chain_id: &'a str,
    tx_hash: &'a str,
    block_number: Option<u64>,
    status: ExecutionStatus,
    confirmations: u64,
    required_confirmations: u64,
    is_finalized: bool,
    previous_result_hash: Hash,
    sequence_number: u64,
}

/// Per-external-transaction execution record, hash-chained per proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainExecutionResult {
    pub proof_id: ProofId,
    pub chain_platform: ChainPlatform,
    pub chain_id: String,
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub status: ExecutionStatus,
    pub confirmations: u64,
    pub required_confirmations: u64,
    pub is_finalized: bool,
    pub result_hash: Hash,
    pub previous_result_hash: Hash,
    pub sequence_number: u64,
    pub finalized_at: Option<i64>,
}

impl ChainExecutionResult {
    /// Build and hash a new result. `previous` is `None` for the first
    /// result in a proof's chain (genesis `previous_result_hash = Hash::ZERO`,
    /// `sequence_number = 0`), `Some(prior)` otherwise.
    pub fn new(
        proof_id: ProofId,
        chain_platform: ChainPlatform,
        chain_id: String,
        tx_hash: String,
        block_number: Option<u64>,
        status: ExecutionStatus,
        confirmations: u64,
        required_confirmations: u64,
        is_finalized: bool,
        previous: Option<&ChainExecutionResult>,
    ) -> Result<Self, AnchorError> {
        let (previous_result_hash, sequence_number) = match previous {
            Some(prior) => (prior.result_hash, prior.sequence_number + 1),
            None => (Hash::ZERO, 0),
        };

        let fields = ResultFields {
            proof_id,
            chain_platform,
            chain_id: &chain_id,
            tx_hash: &tx_hash,
            block_number,
            status,
            confirmations,
            required_confirmations,
            is_finalized,
            previous_result_hash,
            sequence_number,
        };
        let result_hash = compute_result_hash(&fields)?;

        Ok(Self {
            proof_id,
            chain_platform,
            chain_id,
            tx_hash,
            block_number,
            status,
            confirmations,
            required_confirmations,
            is_finalized,
            result_hash,
            previous_result_hash,
            sequence_number,
            finalized_at: None,
        })
    }

    /// Verify this result's own `result_hash` recomputes, and that it links
    /// correctly onto `prior` (sequence contiguity, `previous_result_hash`
    /// equality). `prior = None` asserts this is the chain's genesis entry.
    pub fn verify_linkage(&self, prior: Option<&ChainExecutionResult>) -> Result<(), AnchorError> {
        let fields = ResultFields {
            proof_id: self.proof_id,
            chain_platform: self.chain_platform,
            chain_id: &self.chain_id,
            tx_hash: &self.tx_hash,
            block_number: self.block_number,
            status: self.status,
            confirmations: self.confirmations,
            required_confirmations: self.required_confirmations,
            is_finalized: self.is_finalized,
            previous_result_hash: self.previous_result_hash,
            sequence_number: self.sequence_number,
        };
        let recomputed = compute_result_hash(&fields)?;
        if recomputed != self.result_hash {
            return Err(AnchorError::Malformed(format!(
                "result_hash mismatch for proof {} sequence {}",
                self.proof_id, self.sequence_number
            )));
        }

        match prior {
            Some(prior) => {
                if self.previous_result_hash != prior.result_hash {
                    return Err(AnchorError::Malformed(format!(
                        "hash-chain break: proof {} sequence {} does not link to its predecessor",
                        self.proof_id, self.sequence_number
                    )));
                }
                if self.sequence_number != prior.sequence_number + 1 {
                    return Err(AnchorError::Malformed(format!(
                        "non-contiguous sequence for proof {}: {} does not follow {}",
                        self.proof_id, self.sequence_number, prior.sequence_number
                    )));
                }
            }
            None => {
                if self.sequence_number != 0 || self.previous_result_hash != Hash::ZERO {
                    return Err(AnchorError::Malformed(format!(
                        "proof {} genesis result must have sequence 0 and zero previous_result_hash",
                        self.proof_id
                    )));
                }
            }
        }

        Ok(())
    }
}

fn compute_result_hash(fields: &ResultFields<'_>) -> Result<Hash, AnchorError> {
    let value = serde_json::to_value(fields)
        .map_err(|e| AnchorError::Malformed(format!("result fields don't serialize: {e}")))?;
    let bytes = canonicalize(&value)
        .map_err(|e| AnchorError::Malformed(format!("result fields don't canonicalize: {e}")))?;
    Ok(Hash::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(proof_id: ProofId) -> ChainExecutionResult {
        ChainExecutionResult::new(
            proof_id,
            ChainPlatform::Ethereum,
            "8453".into(),
            "0xabc".into(),
            Some(100),
            ExecutionStatus::Success,
            11,
            12,
            false,
            None,
        )
        .unwrap()
    }

    #[test]
    fn genesis_has_zero_previous_hash_and_sequence_zero() {
        let r = first(ProofId::new());
        assert_eq!(r.sequence_number, 0);
        assert_eq!(r.previous_result_hash, Hash::ZERO);
        r.verify_linkage(None).unwrap();
    }

    #[test]
    fn chained_result_links_to_predecessor() {
        let proof_id = ProofId::new();
        let genesis = first(proof_id);
        let next = ChainExecutionResult::new(
            proof_id,
            ChainPlatform::Ethereum,
            "8453".into(),
            "0xabc".into(),
            Some(101),
            ExecutionStatus::Success,
            12,
            12,
            true,
            Some(&genesis),
        )
        .unwrap();
        assert_eq!(next.sequence_number, 1);
        assert_eq!(next.previous_result_hash, genesis.result_hash);
        next.verify_linkage(Some(&genesis)).unwrap();
    }

    #[test]
    fn tampered_result_hash_is_rejected() {
        let mut r = first(ProofId::new());
        r.confirmations = 12;
        assert!(r.verify_linkage(None).is_err());
    }

    #[test]
    fn broken_chain_link_is_rejected() {
        let proof_id = ProofId::new();
        let genesis = first(proof_id);
        let mut next = ChainExecutionResult::new(
            proof_id,
            ChainPlatform::Ethereum,
            "8453".into(),
            "0xabc".into(),
            Some(101),
            ExecutionStatus::Success,
            12,
            12,
            true,
            Some(&genesis),
        )
        .unwrap();
        next.previous_result_hash = Hash::ZERO;
        assert!(next.verify_linkage(Some(&genesis)).is_err());
    }

    #[test]
    fn non_contiguous_sequence_is_rejected() {
        let proof_id = ProofId::new();
        let genesis = first(proof_id);
        let mut next = ChainExecutionResult::new(
            proof_id,
            ChainPlatform::Ethereum,
            "8453".into(),
            "0xabc".into(),
            Some(101),
            ExecutionStatus::Success,
            12,
            12,
            true,
            Some(&genesis),
        )
        .unwrap();
        next.sequence_number = 5;
        assert!(next.verify_linkage(Some(&genesis)).is_err());
    }
}
