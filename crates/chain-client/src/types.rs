//! Wire-level shapes returned by the source chain's v3 query surface.

use certen_types::Hash;
use serde::{Deserialize, Serialize};

/// One step of a chain receipt: the sibling hash and which side it folds
/// in on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEntry {
    /// The sibling hash.
    pub hash: Hash,
    /// True if `hash` is folded in on the right (`H(current, hash)`),
    /// false if on the left (`H(hash, current)`).
    pub right: bool,
}

/// A Merkle receipt proving `start` folds to `anchor` through `entries`.
///
/// Receipts may recurse: `next`, when present, continues the chain from
/// `anchor` onward, and must satisfy `next.start == self.anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// The leaf this receipt proves inclusion of.
    pub start: Hash,
    /// The root this receipt proves `start` folds to.
    pub anchor: Hash,
    /// The fold steps from `start` to `anchor`.
    pub entries: Vec<ReceiptEntry>,
    /// The minor block index this receipt was recorded at, if known.
    pub local_block: Option<u64>,
    /// A continuation receipt, if this one is itself anchored further.
    pub next: Option<Box<Receipt>>,
}

impl Receipt {
    /// Recompute the fold from `start` through `entries` and check it
    /// equals `anchor`; also checks `next`'s `start` links to this
    /// receipt's `anchor`, recursively.
    pub fn verify(&self) -> bool {
        let mut current = self.start;
        for entry in &self.entries {
            current = if entry.right {
                Hash::from_parts(&[current.as_bytes(), entry.hash.as_bytes()])
            } else {
                Hash::from_parts(&[entry.hash.as_bytes(), current.as_bytes()])
            };
        }
        if current != self.anchor {
            return false;
        }
        match &self.next {
            Some(next) => next.start == self.anchor && next.verify(),
            None => true,
        }
    }
}

/// An account query result: the account's raw state plus, optionally, the
/// receipt for a specific chain entry within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// The account's URL.
    pub url: String,
    /// Raw account state, opaque to this client.
    pub data: serde_json::Value,
    /// Receipt, when the query asked for one.
    pub receipt: Option<Receipt>,
}

/// A single chain-entry query result (e.g. a `main` chain lookup by hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntryRecord {
    /// Index of this entry within its chain.
    pub index: u64,
    /// The leaf hash at this index.
    pub entry_hash: Hash,
    /// Inclusion receipt for this entry.
    pub receipt: Receipt,
}

/// Result of searching an anchor-pool chain for a specific anchor hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorSearchResult {
    /// Index of the matching entry.
    pub index: u64,
    /// The minor block index the match was recorded at.
    pub local_block: u64,
    /// Inclusion receipt for the matching entry.
    pub receipt: Receipt,
}

/// A consensus commit header for a given partition and height.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommitHeader {
    /// Block height.
    pub height: u64,
    /// The consensus application-state hash at this height.
    pub app_hash: Hash,
}

/// The source chain's v3 query response is a tagged union over these
/// record kinds. Exhaustive matching only — never duck-type on shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "recordType")]
pub enum QueryResponse {
    /// An account record.
    Account(AccountRecord),
    /// A chain-entry record.
    ChainEntry(ChainEntryRecord),
    /// An anchor-search result.
    RecordRange(AnchorSearchResult),
}
