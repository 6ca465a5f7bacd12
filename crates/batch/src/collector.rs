//! Batch collector: accumulates proof artifacts into a cadence window (or a
//! single on-demand artifact) and commits a Merkle root at close.
//!
//! Grounded on the teacher's `VoteBatcher` (sort deterministically, build one
//! Merkle tree, commit once): here the "signature" step is replaced by the
//! batch-close commitment (spec §4.E), since artifacts aren't signed until
//! the attestation stage picks up the closed batch.

use crate::error::BatchError;
use crate::types::{Batch, BatchStatus, BatchTransaction, BatchType};
use certen_types::{batch_leaf_hash, build_merkle_tree_with_paths, Hash, ProofId};

/// A proof artifact waiting to be committed into a batch.
#[derive(Debug, Clone)]
pub struct PendingLeaf {
    /// The proof artifact this leaf represents.
    pub proof_id: ProofId,
    /// The originating source transaction hash.
    pub source_tx_hash: Hash,
    /// The artifact's own commitment hash (its canonical content hash).
    pub leaf_hash: Hash,
}

/// A batch that has just been closed: the batch row plus its per-leaf rows,
/// ready for the orchestrator to persist.
#[derive(Debug, Clone)]
pub struct ClosedBatch {
    /// The batch, with `status = Closed` and `merkle_root` set.
    pub batch: Batch,
    /// One row per leaf, dense and ordered by `tree_index`.
    pub transactions: Vec<BatchTransaction>,
}

/// Accumulates artifacts for one batch type and closes them into a
/// [`ClosedBatch`] on a time boundary, a size cap, or on demand.
pub struct BatchCollector {
    cadence_window_s: i64,
    max_batch_size: usize,
    open: Option<(Batch, Vec<PendingLeaf>)>,
}

impl BatchCollector {
    /// Create a collector for on-cadence batching with the given window
    /// length and size cap (spec §4.I `cadence_window_s` /
    /// `cadence_max_batch_size`).
    pub fn new(cadence_window_s: i64, max_batch_size: usize) -> Self {
        Self {
            cadence_window_s,
            max_batch_size,
            open: None,
        }
    }

    /// Number of leaves currently accumulated in the open batch, if any.
    pub fn pending_len(&self) -> usize {
        self.open.as_ref().map_or(0, |(_, leaves)| leaves.len())
    }

    /// Add a leaf to the open cadence batch, opening one if none exists.
    ///
    /// Returns the closed batch if adding this leaf reached the size cap.
    pub fn add(&mut self, leaf: PendingLeaf, now: i64) -> Result<Option<ClosedBatch>, BatchError> {
        let (_, leaves) = self
            .open
            .get_or_insert_with(|| (Batch::open(BatchType::OnCadence, now), Vec::new()));
        leaves.push(leaf);

        if leaves.len() >= self.max_batch_size {
            Ok(Some(self.close(now)?))
        } else {
            Ok(None)
        }
    }

    /// Whether the open batch (if any) has crossed its cadence window
    /// boundary and should be closed even though it hasn't hit the size cap.
    pub fn is_due(&self, now: i64) -> bool {
        match &self.open {
            Some((batch, leaves)) => {
                !leaves.is_empty() && now - batch.window_start >= self.cadence_window_s
            }
            None => false,
        }
    }

    /// Close the open batch if it is due (spec §4.E "time boundary or size
    /// cap"). A no-op, returning `None`, if nothing is open or nothing has
    /// accumulated yet.
    pub fn close_if_due(&mut self, now: i64) -> Result<Option<ClosedBatch>, BatchError> {
        if self.is_due(now) {
            Ok(Some(self.close(now)?))
        } else {
            Ok(None)
        }
    }

    /// Force-close the open batch regardless of cadence or size, e.g. at
    /// shutdown. `None` if nothing is open or the open batch is empty.
    pub fn flush(&mut self, now: i64) -> Result<Option<ClosedBatch>, BatchError> {
        match &self.open {
            Some((_, leaves)) if !leaves.is_empty() => Ok(Some(self.close(now)?)),
            _ => Ok(None),
        }
    }

    fn close(&mut self, now: i64) -> Result<ClosedBatch, BatchError> {
        let (mut batch, leaves) = self
            .open
            .take()
            .ok_or_else(|| BatchError::Invalid("no open batch to close".into()))?;

        if leaves.is_empty() {
            return Err(BatchError::Invalid("cannot close an empty batch".into()));
        }
        if !matches!(batch.status, BatchStatus::Pending) {
            return Err(BatchError::Invalid(format!(
                "batch {} is not pending (status {:?})",
                batch.batch_id, batch.status
            )));
        }

        let (root, transactions) = commit(batch.batch_id, leaves);

        batch.merkle_root = root;
        batch.tx_count = transactions.len() as u32;
        batch.status = BatchStatus::Closed;
        batch.window_end = Some(now);

        Ok(ClosedBatch { batch, transactions })
    }

    /// Commit a single artifact as its own singleton batch, bypassing
    /// cadence accumulation entirely (spec §4.E on-demand mode).
    pub fn commit_on_demand(leaf: PendingLeaf, now: i64) -> ClosedBatch {
        let mut batch = Batch::open(BatchType::OnDemand, now);
        let (root, transactions) = commit(batch.batch_id, vec![leaf]);

        batch.merkle_root = root;
        batch.tx_count = transactions.len() as u32;
        batch.status = BatchStatus::Closed;
        batch.window_end = Some(now);

        ClosedBatch { batch, transactions }
    }
}

/// Sort deterministically, build one Merkle tree, and produce dense,
/// index-ordered [`BatchTransaction`] rows.
fn commit(batch_id: certen_types::BatchId, mut leaves: Vec<PendingLeaf>) -> (Hash, Vec<BatchTransaction>) {
    leaves.sort_by_key(|l| l.source_tx_hash);

    let leaf_hashes: Vec<Hash> = leaves
        .iter()
        .map(|l| {
            batch_leaf_hash(
                &Hash::from_bytes(l.proof_id.as_uuid().as_bytes()),
                &l.source_tx_hash,
                &l.leaf_hash,
            )
        })
        .collect();

    let (root, paths) = build_merkle_tree_with_paths(&leaf_hashes);

    let transactions = leaves
        .into_iter()
        .zip(paths)
        .map(|(leaf, path)| BatchTransaction {
            batch_id,
            tree_index: path.leaf_index,
            merkle_path: path,
            leaf_hash: leaf.leaf_hash,
            proof_id: leaf.proof_id,
            source_tx_hash: leaf.source_tx_hash,
        })
        .collect();

    (root, transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: &[u8]) -> PendingLeaf {
        PendingLeaf {
            proof_id: ProofId::new(),
            source_tx_hash: Hash::from_bytes(tag),
            leaf_hash: Hash::from_bytes(&[tag, b"-leaf"].concat()),
        }
    }

    #[test]
    fn closes_on_size_cap() {
        let mut collector = BatchCollector::new(900, 3);
        assert!(collector.add(leaf(b"a"), 0).unwrap().is_none());
        assert!(collector.add(leaf(b"b"), 0).unwrap().is_none());
        let closed = collector.add(leaf(b"c"), 0).unwrap().expect("size cap hit");

        assert_eq!(closed.batch.tx_count, 3);
        assert_eq!(closed.transactions.len(), 3);
        assert_eq!(closed.batch.status, BatchStatus::Closed);
        assert_ne!(closed.batch.merkle_root, Hash::ZERO);
        assert_eq!(collector.pending_len(), 0);
    }

    #[test]
    fn closes_on_cadence_boundary() {
        let mut collector = BatchCollector::new(900, 1000);
        collector.add(leaf(b"a"), 0).unwrap();
        collector.add(leaf(b"b"), 100).unwrap();

        assert!(!collector.is_due(500));
        assert!(collector.close_if_due(500).unwrap().is_none());

        assert!(collector.is_due(901));
        let closed = collector.close_if_due(901).unwrap().expect("due");
        assert_eq!(closed.batch.tx_count, 2);
        assert_eq!(closed.batch.window_end, Some(901));
    }

    #[test]
    fn on_demand_is_a_singleton_batch() {
        let closed = BatchCollector::commit_on_demand(leaf(b"solo"), 42);
        assert_eq!(closed.batch.batch_type, BatchType::OnDemand);
        assert_eq!(closed.batch.tx_count, 1);
        assert_eq!(closed.transactions.len(), 1);
        assert_eq!(closed.transactions[0].tree_index, 0);

        let tx = &closed.transactions[0];
        let recomputed_leaf = batch_leaf_hash(
            &Hash::from_bytes(tx.proof_id.as_uuid().as_bytes()),
            &tx.source_tx_hash,
            &tx.leaf_hash,
        );
        assert_eq!(closed.batch.merkle_root, recomputed_leaf);
    }

    #[test]
    fn every_leaf_path_recomputes_to_the_root() {
        let mut collector = BatchCollector::new(900, 7);
        let mut closed = None;
        for tag in [b"a", b"b", b"c", b"d", b"e"] {
            closed = collector.add(leaf(tag), 0).unwrap();
        }
        let closed = closed.or_else(|| collector.flush(0).unwrap()).unwrap();

        for tx in &closed.transactions {
            let recomputed_leaf = batch_leaf_hash(
                &Hash::from_bytes(tx.proof_id.as_uuid().as_bytes()),
                &tx.source_tx_hash,
                &tx.leaf_hash,
            );
            assert!(tx.merkle_path.verify(&recomputed_leaf, &closed.batch.merkle_root));
        }
    }

    #[test]
    fn tree_indices_are_dense_and_unique() {
        let mut collector = BatchCollector::new(900, 10);
        let mut closed = None;
        for tag in [b"a", b"b", b"c", b"d", b"e", b"f", b"g"] {
            closed = collector.add(leaf(tag), 0).unwrap();
        }
        let closed = closed.unwrap();

        let mut indices: Vec<u32> = closed.transactions.iter().map(|t| t.tree_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..closed.transactions.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn closing_an_empty_batch_is_rejected() {
        let mut collector = BatchCollector::new(900, 10);
        assert!(matches!(collector.close(0), Err(BatchError::Invalid(_))));
    }

    #[test]
    fn tx_count_matches_linked_rows() {
        let closed = BatchCollector::commit_on_demand(leaf(b"solo"), 0);
        assert_eq!(closed.batch.tx_count as usize, closed.transactions.len());
    }
}
