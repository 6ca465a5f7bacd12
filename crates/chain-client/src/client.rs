use crate::error::ChainClientError;
use crate::types::{AccountRecord, AnchorSearchResult, ChainEntryRecord, CommitHeader};
use async_trait::async_trait;
use certen_types::Hash;

/// Read-only access to the source chain's v3 query surface.
///
/// Every method validates its own response shape (hash lengths, hex
/// well-formedness) before returning — callers can trust that a `Some`
/// result is structurally sound, though they must still verify receipts
/// themselves (see [`crate::types::Receipt::verify`]).
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch an account by URL, with an optional receipt for the given
    /// chain entry hash if `entry_hash` is supplied.
    async fn query_account(
        &self,
        url: &str,
        entry_hash: Option<Hash>,
    ) -> Result<AccountRecord, ChainClientError>;

    /// Look up a specific entry on one of an account's chains (e.g. the
    /// `main` chain) by its leaf hash.
    async fn query_chain_entry(
        &self,
        account: &str,
        chain_name: &str,
        entry_hash: Hash,
    ) -> Result<ChainEntryRecord, ChainClientError>;

    /// Search an anchor-pool chain (`anchor(<partition>)-<suffix>`, suffix
    /// being `root` or `bpt`) for the entry whose leaf equals `anchor_hash`.
    async fn search_anchor_chain(
        &self,
        partition: &str,
        suffix: &str,
        anchor_hash: Hash,
    ) -> Result<AnchorSearchResult, ChainClientError>;

    /// Fetch the paired entry on the companion anchor chain at the same
    /// dense index (used to recover the `root`/`bpt` pairing invariant).
    async fn anchor_chain_entry_at(
        &self,
        partition: &str,
        suffix: &str,
        index: u64,
    ) -> Result<AnchorSearchResult, ChainClientError>;

    /// Fetch the consensus commit header (app-hash) for a partition at a
    /// given height.
    async fn commit_header(
        &self,
        partition: &str,
        height: u64,
    ) -> Result<CommitHeader, ChainClientError>;

    /// List the partitions currently known to the network.
    async fn network_status(&self) -> Result<Vec<String>, ChainClientError>;
}
