//! L1-L3 chained anchor proof builder.
//!
//! Pure with respect to I/O in the sense that matters here: every fetch goes
//! through [`ChainClient`], and every invariant check is synchronous, local,
//! and fail-closed — no partial proof is ever returned (spec §4.B).

use crate::error::ProofError;
use crate::types::{ChainedProof, L1Proof, L2Proof, L3Proof, SourcePartition};
use certen_chain_client::{ChainClient, Receipt};
use certen_types::Hash;

const MAIN_CHAIN: &str = "main";
const ROOT_SUFFIX: &str = "root";
const BPT_SUFFIX: &str = "bpt";
const DIRECTORY: &str = "directory";

fn verify_receipt(receipt: &Receipt, what: &str) -> Result<(), ProofError> {
    if !receipt.verify() {
        return Err(ProofError::Malformed(format!(
            "{what} receipt fails to recompute from start to anchor"
        )));
    }
    Ok(())
}

/// Build the L1 proof: source transaction inclusion into its account's
/// `main` chain.
async fn build_l1(
    client: &dyn ChainClient,
    source_account: &str,
    source_tx_hash: Hash,
) -> Result<L1Proof, ProofError> {
    let entry = client
        .query_chain_entry(source_account, MAIN_CHAIN, source_tx_hash)
        .await?;

    if entry.entry_hash != source_tx_hash {
        return Err(ProofError::Invalid(
            "main chain entry hash does not match source tx hash".into(),
        ));
    }
    if entry.receipt.start != source_tx_hash {
        return Err(ProofError::Invalid(
            "main chain receipt does not start at the source tx hash".into(),
        ));
    }
    verify_receipt(&entry.receipt, "L1 main-chain")?;

    let bvn_mbi = entry.receipt.local_block.ok_or_else(|| {
        ProofError::Malformed("L1 receipt missing local block index".into())
    })?;

    Ok(L1Proof {
        source_tx_hash,
        bvn_root_chain_anchor: entry.receipt.anchor,
        receipt: entry.receipt,
        bvn_mbi,
    })
}

/// Search an anchor-pool `root`/`bpt` pair for `anchor_hash`, enforcing the
/// pairing invariant (spec §4.B / §8) and rejecting a receipt whose `start`
/// doesn't match what was searched for (scenario seed 3).
async fn find_anchor_pair(
    client: &dyn ChainClient,
    partition: &str,
    anchor_hash: Hash,
    layer: &str,
) -> Result<(u64, u64, Receipt, Receipt), ProofError> {
    let root_result = client
        .search_anchor_chain(partition, ROOT_SUFFIX, anchor_hash)
        .await?;

    if root_result.receipt.start != anchor_hash {
        return Err(ProofError::NotFound(format!(
            "{layer}: anchor({partition})-root entry has start != expected anchor hash"
        )));
    }
    verify_receipt(&root_result.receipt, &format!("{layer} root"))?;

    let bpt_result = client
        .anchor_chain_entry_at(partition, BPT_SUFFIX, root_result.index)
        .await?;
    verify_receipt(&bpt_result.receipt, &format!("{layer} bpt"))?;

    if root_result.receipt.anchor != bpt_result.receipt.anchor {
        return Err(ProofError::Malformed(format!(
            "{layer}: root/bpt anchor mismatch at index {}",
            root_result.index
        )));
    }
    if root_result.local_block != bpt_result.local_block {
        return Err(ProofError::Malformed(format!(
            "{layer}: root/bpt localBlock mismatch at index {}",
            root_result.index
        )));
    }

    Ok((
        root_result.index,
        root_result.local_block,
        root_result.receipt,
        bpt_result.receipt,
    ))
}

/// Build L2: the BVN root anchored into the DN's per-partition anchor pool.
async fn build_l2(
    client: &dyn ChainClient,
    partition: &str,
    l1: &L1Proof,
) -> Result<L2Proof, ProofError> {
    let (dn_index, dn_mbi, root_receipt, bpt_receipt) =
        find_anchor_pair(client, partition, l1.bvn_root_chain_anchor, "L2").await?;

    Ok(L2Proof {
        bvn_state_tree_anchor: bpt_receipt.anchor,
        root_receipt,
        bpt_receipt,
        dn_index,
        dn_mbi,
    })
}

/// Build L3: the DN's own self-anchor, searched using the DN-root-chain
/// anchor value produced by L2's pairing (or, in the DN-shortcut case,
/// directly from L1).
async fn build_l3(
    client: &dyn ChainClient,
    dn_root_chain_anchor: Hash,
    min_mbi: u64,
) -> Result<L3Proof, ProofError> {
    let (dn_root_index, dn_final_mbi, root_receipt, bpt_receipt) =
        find_anchor_pair(client, DIRECTORY, dn_root_chain_anchor, "L3").await?;

    if dn_final_mbi < min_mbi {
        return Err(ProofError::Malformed(format!(
            "L3 final MBI {dn_final_mbi} precedes L2 MBI {min_mbi}"
        )));
    }

    Ok(L3Proof {
        dn_state_tree_anchor: bpt_receipt.anchor,
        root_receipt,
        bpt_receipt,
        dn_root_index,
        dn_final_mbi,
    })
}

async fn verify_consensus(
    client: &dyn ChainClient,
    partition: &str,
    mbi: u64,
    expected_app_hash: Hash,
) -> Result<bool, ProofError> {
    let header = client.commit_header(partition, mbi + 1).await?;
    if header.app_hash != expected_app_hash {
        return Err(ProofError::Malformed(format!(
            "consensus app-hash mismatch for {partition} at height {}",
            mbi + 1
        )));
    }
    Ok(true)
}

/// Build the full L1-L3 chained anchor proof.
///
/// `source_partition` governs whether the DN-partition short-circuit
/// applies (spec §9 Open Question 2, pinned by scenario seed 1): when the
/// source account lives directly on the Directory Network, L1's receipt is
/// restated as the L3-equivalent anchor and L2 is omitted entirely.
pub async fn build_chained_proof(
    client: &dyn ChainClient,
    source_account: &str,
    source_tx_hash: Hash,
    source_partition: SourcePartition,
) -> Result<ChainedProof, ProofError> {
    let l1 = build_l1(client, source_account, source_tx_hash).await?;

    if source_partition.is_directory() {
        let dn_consensus_verified =
            verify_consensus(client, DIRECTORY, l1.bvn_mbi, l1.bvn_root_chain_anchor).await?;

        let l3 = L3Proof {
            dn_state_tree_anchor: l1.bvn_root_chain_anchor,
            root_receipt: l1.receipt.clone(),
            bpt_receipt: l1.receipt.clone(),
            dn_root_index: 0,
            dn_final_mbi: l1.bvn_mbi,
        };

        return Ok(ChainedProof {
            source_partition,
            l1,
            l2: None,
            l3,
            bvn_consensus_verified: false,
            dn_consensus_verified,
        });
    }

    let l2 = build_l2(client, &source_partition.0, &l1).await?;
    let bvn_consensus_verified =
        verify_consensus(client, &source_partition.0, l1.bvn_mbi, l2.bvn_state_tree_anchor)
            .await?;

    let l3 = build_l3(client, l2.bvn_state_tree_anchor, l2.dn_mbi).await?;
    let dn_consensus_verified =
        verify_consensus(client, DIRECTORY, l2.dn_mbi, l3.dn_state_tree_anchor).await?;

    Ok(ChainedProof {
        source_partition,
        l1,
        l2: Some(l2),
        l3,
        bvn_consensus_verified,
        dn_consensus_verified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use certen_chain_client::{AnchorSearchResult, ChainEntryRecord, CommitHeader, MemoryChainClient, ReceiptEntry};

    fn receipt_for(leaf: Hash, local_block: u64) -> (Receipt, Hash) {
        let sibling = Hash::from_bytes(b"sibling");
        let anchor = Hash::from_parts(&[leaf.as_bytes(), sibling.as_bytes()]);
        (
            Receipt {
                start: leaf,
                anchor,
                entries: vec![ReceiptEntry { hash: sibling, right: true }],
                local_block: Some(local_block),
                next: None,
            },
            anchor,
        )
    }

    fn seed_full_chain(client: &MemoryChainClient, tx: Hash) -> Hash {
        let (l1_receipt, bvn_root_anchor) = receipt_for(tx, 10);
        client.with_chain_entry(
            "acc://acme/tokens",
            MAIN_CHAIN,
            tx,
            ChainEntryRecord { index: 0, entry_hash: tx, receipt: l1_receipt },
        );

        let (l2_root_receipt, dn_root_chain_anchor) = receipt_for(bvn_root_anchor, 20);
        let l2_bpt_receipt = Receipt { local_block: Some(20), ..l2_root_receipt.clone() };
        client.with_anchor_search(
            "bvn1", ROOT_SUFFIX, bvn_root_anchor,
            AnchorSearchResult { index: 5, local_block: 20, receipt: l2_root_receipt },
        );
        client.with_anchor_entry_at(
            "bvn1", BPT_SUFFIX, 5,
            AnchorSearchResult { index: 5, local_block: 20, receipt: l2_bpt_receipt },
        );
        client.with_commit_header("bvn1", 11, CommitHeader { height: 11, app_hash: dn_root_chain_anchor });

        let (l3_root_receipt, dn_state_tree_anchor) = receipt_for(dn_root_chain_anchor, 30);
        let l3_bpt_receipt = Receipt { local_block: Some(30), ..l3_root_receipt.clone() };
        client.with_anchor_search(
            DIRECTORY, ROOT_SUFFIX, dn_root_chain_anchor,
            AnchorSearchResult { index: 7, local_block: 30, receipt: l3_root_receipt },
        );
        client.with_anchor_entry_at(
            DIRECTORY, BPT_SUFFIX, 7,
            AnchorSearchResult { index: 7, local_block: 30, receipt: l3_bpt_receipt },
        );
        // DN consensus binding queries DN_MBI + 1, where DN_MBI is L2's value (20),
        // not L3's DN_FINAL_MBI (30) -- those are allowed to differ (spec §4.B).
        client.with_commit_header(DIRECTORY, 21, CommitHeader { height: 21, app_hash: dn_state_tree_anchor });

        dn_state_tree_anchor
    }

    #[tokio::test]
    async fn full_chain_builds_and_verifies() {
        let client = MemoryChainClient::new();
        let tx = Hash::from_bytes(b"tx-hash");
        seed_full_chain(&client, tx);

        let proof = build_chained_proof(
            &client,
            "acc://acme/tokens",
            tx,
            SourcePartition("bvn1".to_string()),
        )
        .await
        .unwrap();

        assert!(!proof.is_dn_shortcut());
        assert!(proof.bvn_consensus_verified);
        assert!(proof.dn_consensus_verified);
        assert_eq!(proof.l3.dn_final_mbi, 30);
    }

    #[tokio::test]
    async fn dn_partition_short_circuit() {
        // Scenario seed 1.
        let client = MemoryChainClient::new();
        let tx = Hash::from_bytes(b"dn-tx-hash");
        let (l1_receipt, anchor) = receipt_for(tx, 40);
        client.with_chain_entry(
            "acc://dn.acme/anchors",
            MAIN_CHAIN,
            tx,
            ChainEntryRecord { index: 0, entry_hash: tx, receipt: l1_receipt },
        );
        client.with_commit_header(DIRECTORY, 41, CommitHeader { height: 41, app_hash: anchor });

        let proof = build_chained_proof(
            &client,
            "acc://dn.acme/anchors",
            tx,
            SourcePartition("dn".to_string()),
        )
        .await
        .unwrap();

        assert!(proof.is_dn_shortcut());
        assert_eq!(proof.l1.bvn_root_chain_anchor, proof.l3.dn_state_tree_anchor);
        assert!(proof.dn_consensus_verified);
        assert!(!proof.bvn_consensus_verified);
    }

    #[tokio::test]
    async fn missing_dn_receipt_fails_fast() {
        // Scenario seed 2.
        let client = MemoryChainClient::new();
        let tx = Hash::from_bytes(b"tx-no-dn");
        let (l1_receipt, _anchor) = receipt_for(tx, 10);
        client.with_chain_entry(
            "acc://acme/tokens",
            MAIN_CHAIN,
            tx,
            ChainEntryRecord { index: 0, entry_hash: tx, receipt: l1_receipt },
        );
        // No anchor(bvn1)-root entry seeded at all.

        let err = build_chained_proof(
            &client,
            "acc://acme/tokens",
            tx,
            SourcePartition("bvn1".to_string()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProofError::NotFound(_)));
    }

    #[tokio::test]
    async fn wrong_start_dn_receipt_is_rejected() {
        // Scenario seed 3.
        let client = MemoryChainClient::new();
        let tx = Hash::from_bytes(b"tx-wrong-start");
        let (l1_receipt, bvn_root_anchor) = receipt_for(tx, 10);
        client.with_chain_entry(
            "acc://acme/tokens",
            MAIN_CHAIN,
            tx,
            ChainEntryRecord { index: 0, entry_hash: tx, receipt: l1_receipt },
        );

        // Seed a DN receipt whose `start` is something else entirely.
        let wrong_leaf = Hash::from_bytes(b"not the bvn root anchor");
        let (bad_receipt, _) = receipt_for(wrong_leaf, 20);
        client.with_anchor_search(
            "bvn1",
            ROOT_SUFFIX,
            bvn_root_anchor,
            AnchorSearchResult { index: 5, local_block: 20, receipt: bad_receipt },
        );

        let err = build_chained_proof(
            &client,
            "acc://acme/tokens",
            tx,
            SourcePartition("bvn1".to_string()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProofError::NotFound(_)));
    }
}
