//! Batch and per-leaf commitment records (spec §3).

use certen_types::{BatchId, Hash, MerklePath, ProofId};
use serde::{Deserialize, Serialize};

/// Which trigger produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    /// Accumulated on the cadence ticker until a time boundary or size cap.
    OnCadence,
    /// A singleton batch containing exactly one artifact.
    OnDemand,
}

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Accepting new leaves.
    Pending,
    /// Root computed; no further leaves accepted.
    Closed,
    /// Anchor submission in flight.
    Anchoring,
    /// Anchor transaction submitted, awaiting confirmations.
    Anchored,
    /// Waiting for the external chain's finality depth.
    WaitingForConfirmations,
    /// External anchor transaction finalized.
    Confirmed,
    /// Terminal failure.
    Failed,
}

impl BatchStatus {
    /// Whether the batch has progressed far enough that its root is fixed
    /// and the auditable round-trip invariant (spec §4.E/§8) must hold.
    pub fn is_at_least_closed(self) -> bool {
        !matches!(self, BatchStatus::Pending)
    }
}

/// A bounded collection of proof artifacts sharing a cadence window, or a
/// single on-demand artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier.
    pub batch_id: BatchId,
    /// Which trigger this batch follows.
    pub batch_type: BatchType,
    /// Empty ([`Hash::ZERO`]) until the batch is closed; written exactly
    /// once, at close (spec §3 invariant).
    pub merkle_root: Hash,
    /// Number of artifacts in the batch. Equals the number of linked
    /// [`BatchTransaction`] rows (spec §3 invariant).
    pub tx_count: u32,
    /// Lifecycle status.
    pub status: BatchStatus,
    /// Cadence window start (Unix seconds).
    pub window_start: i64,
    /// Cadence window end (Unix seconds), set at close.
    pub window_end: Option<i64>,
}

impl Batch {
    /// Open a new, empty batch for the given cadence window.
    pub fn open(batch_type: BatchType, window_start: i64) -> Self {
        Self {
            batch_id: BatchId::new(),
            batch_type,
            merkle_root: Hash::ZERO,
            tx_count: 0,
            status: BatchStatus::Pending,
            window_start,
            window_end: None,
        }
    }
}

/// A single proof artifact's leaf in a batch, with its inclusion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransaction {
    /// The batch this leaf belongs to.
    pub batch_id: BatchId,
    /// Dense, unique index within the batch (spec §3 invariant).
    pub tree_index: u32,
    /// Inclusion path from this leaf to the batch root.
    pub merkle_path: MerklePath,
    /// The leaf hash: `SHA-256(proof_id || source_tx_hash || leaf_hash)`.
    pub leaf_hash: Hash,
    /// The proof artifact this leaf represents.
    pub proof_id: ProofId,
    /// The originating source transaction hash.
    pub source_tx_hash: Hash,
}
