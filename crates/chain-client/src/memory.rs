//! An in-memory [`ChainClient`] test double.
//!
//! Lets tests seed exact fixtures for every query shape the proof builder
//! depends on, so the full L1-L3/G0-G2 construction (including the literal
//! scenario seeds) can be driven deterministically without a network.

use crate::client::ChainClient;
use crate::error::ChainClientError;
use crate::types::{AccountRecord, AnchorSearchResult, ChainEntryRecord, CommitHeader};
use async_trait::async_trait;
use certen_types::Hash;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct Fixtures {
    accounts: HashMap<String, AccountRecord>,
    chain_entries: HashMap<(String, String, Hash), ChainEntryRecord>,
    anchor_search: HashMap<(String, String, Hash), AnchorSearchResult>,
    anchor_by_index: HashMap<(String, String, u64), AnchorSearchResult>,
    commits: HashMap<(String, u64), CommitHeader>,
    partitions: Vec<String>,
}

/// An in-memory stand-in for the source chain, driven entirely by seeded
/// fixtures.
pub struct MemoryChainClient {
    fixtures: Mutex<Fixtures>,
}

impl MemoryChainClient {
    /// An empty client; every query returns `NotFound` until fixtures are
    /// seeded.
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(Fixtures::default()),
        }
    }

    /// Seed an account record.
    pub fn with_account(&self, url: &str, record: AccountRecord) -> &Self {
        self.fixtures
            .lock()
            .unwrap()
            .accounts
            .insert(url.to_string(), record);
        self
    }

    /// Seed a chain-entry lookup.
    pub fn with_chain_entry(
        &self,
        account: &str,
        chain_name: &str,
        entry_hash: Hash,
        record: ChainEntryRecord,
    ) -> &Self {
        self.fixtures.lock().unwrap().chain_entries.insert(
            (account.to_string(), chain_name.to_string(), entry_hash),
            record,
        );
        self
    }

    /// Seed an anchor-chain search-by-hash result, and its by-index form
    /// (callers fetch the paired chain by index after finding this one).
    pub fn with_anchor_search(
        &self,
        partition: &str,
        suffix: &str,
        anchor_hash: Hash,
        result: AnchorSearchResult,
    ) -> &Self {
        let mut f = self.fixtures.lock().unwrap();
        f.anchor_by_index.insert(
            (partition.to_string(), suffix.to_string(), result.index),
            result.clone(),
        );
        f.anchor_search.insert(
            (partition.to_string(), suffix.to_string(), anchor_hash),
            result,
        );
        self
    }

    /// Seed an anchor-chain entry addressable only by index (the paired
    /// `bpt` lookup never searches by hash).
    pub fn with_anchor_entry_at(
        &self,
        partition: &str,
        suffix: &str,
        index: u64,
        result: AnchorSearchResult,
    ) -> &Self {
        self.fixtures
            .lock()
            .unwrap()
            .anchor_by_index
            .insert((partition.to_string(), suffix.to_string(), index), result);
        self
    }

    /// Seed a consensus commit header.
    pub fn with_commit_header(&self, partition: &str, height: u64, header: CommitHeader) -> &Self {
        self.fixtures
            .lock()
            .unwrap()
            .commits
            .insert((partition.to_string(), height), header);
        self
    }

    /// Seed the partition list returned by `network_status`.
    pub fn with_partitions(&self, partitions: Vec<String>) -> &Self {
        self.fixtures.lock().unwrap().partitions = partitions;
        self
    }
}

impl Default for MemoryChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MemoryChainClient {
    async fn query_account(
        &self,
        url: &str,
        _entry_hash: Option<Hash>,
    ) -> Result<AccountRecord, ChainClientError> {
        self.fixtures
            .lock()
            .unwrap()
            .accounts
            .get(url)
            .cloned()
            .ok_or_else(|| ChainClientError::NotFound(format!("account {url}")))
    }

    async fn query_chain_entry(
        &self,
        account: &str,
        chain_name: &str,
        entry_hash: Hash,
    ) -> Result<ChainEntryRecord, ChainClientError> {
        self.fixtures
            .lock()
            .unwrap()
            .chain_entries
            .get(&(account.to_string(), chain_name.to_string(), entry_hash))
            .cloned()
            .ok_or_else(|| {
                ChainClientError::NotFound(format!("chain entry {account}/{chain_name}"))
            })
    }

    async fn search_anchor_chain(
        &self,
        partition: &str,
        suffix: &str,
        anchor_hash: Hash,
    ) -> Result<AnchorSearchResult, ChainClientError> {
        self.fixtures
            .lock()
            .unwrap()
            .anchor_search
            .get(&(partition.to_string(), suffix.to_string(), anchor_hash))
            .cloned()
            .ok_or_else(|| {
                ChainClientError::NotFound(format!(
                    "anchor({partition})-{suffix} entry for {anchor_hash}"
                ))
            })
    }

    async fn anchor_chain_entry_at(
        &self,
        partition: &str,
        suffix: &str,
        index: u64,
    ) -> Result<AnchorSearchResult, ChainClientError> {
        self.fixtures
            .lock()
            .unwrap()
            .anchor_by_index
            .get(&(partition.to_string(), suffix.to_string(), index))
            .cloned()
            .ok_or_else(|| {
                ChainClientError::NotFound(format!("anchor({partition})-{suffix}[{index}]"))
            })
    }

    async fn commit_header(
        &self,
        partition: &str,
        height: u64,
    ) -> Result<CommitHeader, ChainClientError> {
        self.fixtures
            .lock()
            .unwrap()
            .commits
            .get(&(partition.to_string(), height))
            .copied()
            .ok_or_else(|| ChainClientError::NotFound(format!("commit({partition}, {height})")))
    }

    async fn network_status(&self) -> Result<Vec<String>, ChainClientError> {
        Ok(self.fixtures.lock().unwrap().partitions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommitHeader, ReceiptEntry};

    #[tokio::test]
    async fn returns_not_found_when_unseeded() {
        let client = MemoryChainClient::new();
        let err = client.commit_header("bvn1", 10).await.unwrap_err();
        assert!(matches!(err, ChainClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn round_trips_seeded_commit_header() {
        let client = MemoryChainClient::new();
        let app_hash = Hash::from_bytes(b"state root");
        client.with_commit_header("bvn1", 10, CommitHeader { height: 10, app_hash });

        let header = client.commit_header("bvn1", 10).await.unwrap();
        assert_eq!(header.app_hash, app_hash);
    }

    #[tokio::test]
    async fn chain_entry_receipt_verifies() {
        let client = MemoryChainClient::new();
        let leaf = Hash::from_bytes(b"tx");
        let sibling = Hash::from_bytes(b"sibling");
        let anchor = Hash::from_parts(&[leaf.as_bytes(), sibling.as_bytes()]);

        let receipt = crate::types::Receipt {
            start: leaf,
            anchor,
            entries: vec![ReceiptEntry {
                hash: sibling,
                right: true,
            }],
            local_block: Some(5),
            next: None,
        };
        client.with_chain_entry(
            "acc://foo",
            "main",
            leaf,
            ChainEntryRecord {
                index: 0,
                entry_hash: leaf,
                receipt: receipt.clone(),
            },
        );

        let got = client.query_chain_entry("acc://foo", "main", leaf).await.unwrap();
        assert!(got.receipt.verify());
        assert_eq!(got.receipt.anchor, anchor);
    }
}
