//! The chained anchor proof (L1-L3) and governance proof (G0-G2) data model.

use certen_chain_client::Receipt;
use certen_types::Hash;
use serde::{Deserialize, Serialize};

/// Which sub-partition a source transaction lives on. The Directory Network
/// itself is a special partition: proofs against it collapse L2/L3 (see
/// [`ChainedProof::dn_shortcut`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePartition(pub String);

impl SourcePartition {
    /// True if this is the Directory Network partition itself, rather than
    /// a BVN sub-partition.
    pub fn is_directory(&self) -> bool {
        self.0.eq_ignore_ascii_case("dn") || self.0.eq_ignore_ascii_case("directory")
    }
}

/// L1: transaction inclusion into the BVN (or DN, if the source partition
/// is the directory) root chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L1Proof {
    /// The source transaction hash this proof is for.
    pub source_tx_hash: Hash,
    /// The receipt proving `source_tx_hash` folds to `bvn_root_chain_anchor`.
    pub receipt: Receipt,
    /// `receipt.anchor`, named for what it represents at this layer.
    pub bvn_root_chain_anchor: Hash,
    /// The minor block index the receipt was recorded at.
    pub bvn_mbi: u64,
}

/// L2: the BVN root anchored into the DN's per-partition anchor pool,
/// paired with the BVN's own state-tree anchor at the same index.
///
/// `None` when the source partition is the Directory Network itself — the
/// proof collapses to L1 directly (spec §9 Open Question 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L2Proof {
    /// Receipt on `anchor(<partition>)-root` proving `bvn_root_chain_anchor`
    /// folds into the DN's root-chain anchor pool.
    pub root_receipt: Receipt,
    /// Receipt on `anchor(<partition>)-bpt` at the same dense index.
    pub bpt_receipt: Receipt,
    /// Dense index shared by `root_receipt` and `bpt_receipt`.
    pub dn_index: u64,
    /// Minor block index of the DN anchor entry.
    pub dn_mbi: u64,
    /// The BVN's state-tree anchor (= `bpt_receipt.anchor`).
    pub bvn_state_tree_anchor: Hash,
}

/// L3: the DN's own root self-anchored into its own anchor pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L3Proof {
    /// Receipt on `anchor(directory)-root`.
    pub root_receipt: Receipt,
    /// Receipt on `anchor(directory)-bpt` at the same dense index.
    pub bpt_receipt: Receipt,
    /// Dense index shared by both receipts.
    pub dn_root_index: u64,
    /// Minor block index of the DN's final self-anchor (`>= L2.dn_mbi`).
    pub dn_final_mbi: u64,
    /// The DN's state-tree anchor (= `bpt_receipt.anchor`).
    pub dn_state_tree_anchor: Hash,
}

/// The full three-layer chained anchor proof, L1 through L3, plus the
/// consensus app-hash bindings that tie each tier's state-tree anchor to
/// a committed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedProof {
    /// The partition `source_tx_hash` was submitted on.
    pub source_partition: SourcePartition,
    /// L1: transaction inclusion.
    pub l1: L1Proof,
    /// L2: BVN root anchored into the DN. `None` iff `source_partition` is
    /// the directory (the DN-partition short-circuit, spec §9/§8 seed 1).
    pub l2: Option<L2Proof>,
    /// L3: DN self-anchor. Always present; equals `l1` verbatim (restated
    /// as the L3-equivalent anchor) for the DN-partition short-circuit.
    pub l3: L3Proof,
    /// `commit_header(BVN, L1.bvn_mbi + 1).app_hash == L2.bvn_state_tree_anchor`
    /// (skipped for the DN-partition case, where there is no separate BVN).
    pub bvn_consensus_verified: bool,
    /// `commit_header(DN, L2.dn_mbi + 1).app_hash == L3.dn_state_tree_anchor`
    /// (DN_MBI comes from L2's pairing, not L3's `dn_final_mbi`, which may be
    /// later; for the DN-partition short-circuit there is no L2 and
    /// `L1.bvn_mbi` stands in for `DN_MBI`).
    pub dn_consensus_verified: bool,
}

impl ChainedProof {
    /// True if this proof took the DN-partition short-circuit (L2 omitted,
    /// L1 restated as L3).
    pub fn is_dn_shortcut(&self) -> bool {
        self.l2.is_none()
    }

    /// The proof's terminal anchor: the DN state-tree anchor that consensus
    /// binding verifies against the DN's committed app-hash.
    pub fn terminal_anchor(&self) -> Hash {
        self.l3.dn_state_tree_anchor
    }
}

/// Governance proof strength. Ordered: `G0 < G1 < G2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GovernanceLevel {
    /// Inclusion/finality only: the transaction is anchored per L1-L3.
    G0,
    /// Authority validated: key-page M-of-N threshold was met.
    G1,
    /// Outcome bound: the intent payload hash is bound to the verified
    /// authority and the replay window was honored.
    G2,
}

/// G1 fields: the authority chain validated over the governance blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityProof {
    /// The key page's authority URL, as named in the governance blob.
    pub authority_url: String,
    /// Number of key pages inspected.
    pub key_page_count: u32,
    /// Required signature threshold (M of N).
    pub threshold_m: u32,
    /// Total key count (M of N).
    pub threshold_n: u32,
    /// Number of valid signatures actually observed.
    pub signature_count: u32,
}

impl AuthorityProof {
    /// `signature_count >= threshold_m`.
    pub fn threshold_met(&self) -> bool {
        self.signature_count >= self.threshold_m
    }
}

/// G2 fields: the outcome hash bound to the verified authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeProof {
    /// A short discriminator naming the outcome kind (e.g. `"transfer"`).
    pub outcome_type: String,
    /// Digest of the canonicalized intent payload.
    pub outcome_hash: Hash,
    /// Only true when the payload canonicalizes to the blob-committed hash
    /// *and* the replay window `[created_at, expires_at]` was honored.
    pub binding_enforced: bool,
}

/// The assembled governance proof, layered on top of a [`ChainedProof`].
///
/// `level` is the highest level successfully attained; a failure at G1 or
/// G2 degrades the level without invalidating the lower levels already
/// attained (spec §4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceProof {
    /// Highest level attained.
    pub level: GovernanceLevel,
    /// G0: present once consensus binding succeeded (always, once this
    /// struct exists at all).
    pub block_height: u64,
    /// Unix-seconds finality time recorded for G0.
    pub finality_time: i64,
    /// Present once G1 or G2 was attained.
    pub authority: Option<AuthorityProof>,
    /// Present only once G2 was attained.
    pub outcome: Option<OutcomeProof>,
}
