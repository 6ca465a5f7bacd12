//! Governance proof (G0-G2) builder, layered on top of a [`ChainedProof`].

use crate::error::ProofError;
use crate::types::{
    AuthorityProof, ChainedProof, GovernanceLevel, GovernanceProof, OutcomeProof,
};
use certen_canonical::canonical_hash;
use certen_types::Hash;
use serde_json::Value;

/// The materialized authority facts a caller has already extracted from the
/// intent's governance blob and the source transaction's key-page
/// signatures. The builder here only validates and binds them; it does not
/// itself parse the governance blob's account-model specifics — that
/// belongs to the chain-client/account layer (spec §4.C treats this as an
/// "authority materialization" handed in).
#[derive(Debug, Clone)]
pub struct AuthorityMaterialization {
    /// The key page's authority URL.
    pub authority_url: String,
    /// Number of key pages inspected.
    pub key_page_count: u32,
    /// Required signature threshold (M of N).
    pub threshold_m: u32,
    /// Total key count.
    pub threshold_n: u32,
    /// Observed valid signature count.
    pub signature_count: u32,
}

/// The replay-window and outcome facts needed for G2.
#[derive(Debug, Clone)]
pub struct OutcomeMaterialization {
    /// Short discriminator for the outcome kind.
    pub outcome_type: String,
    /// The canonicalized intent payload whose digest must match
    /// `committed_outcome_hash`.
    pub intent_payload: Value,
    /// The outcome hash committed to in the governance blob.
    pub committed_outcome_hash: Hash,
    /// Replay window start (Unix seconds, inclusive).
    pub created_at: i64,
    /// Replay window end (Unix seconds, inclusive).
    pub expires_at: i64,
    /// The time at which binding is evaluated (Unix seconds).
    pub evaluated_at: i64,
}

/// Build the governance proof for a transaction whose L1-L3 chained proof
/// has already been constructed.
///
/// `authority` and `outcome` are optional because a caller may request only
/// G0 (inclusion/finality) for a given proof class; when present, the
/// builder attempts to reach the corresponding level, degrading rather than
/// failing the whole proof when a higher level's check doesn't hold (spec
/// §4.C: "failure at any stage degrades the level but does not invalidate
/// lower ones").
pub fn build_governance_proof(
    chained: &ChainedProof,
    finality_time: i64,
    authority: Option<&AuthorityMaterialization>,
    outcome: Option<&OutcomeMaterialization>,
) -> Result<GovernanceProof, ProofError> {
    if !chained.dn_consensus_verified {
        return Err(ProofError::Invalid(
            "cannot build a governance proof over an unverified chained proof".into(),
        ));
    }

    let block_height = chained
        .l2
        .as_ref()
        .map(|l2| l2.dn_mbi)
        .unwrap_or(chained.l1.bvn_mbi);

    let mut proof = GovernanceProof {
        level: GovernanceLevel::G0,
        block_height,
        finality_time,
        authority: None,
        outcome: None,
    };

    let Some(authority) = authority else {
        return Ok(proof);
    };

    let authority_proof = AuthorityProof {
        authority_url: authority.authority_url.clone(),
        key_page_count: authority.key_page_count,
        threshold_m: authority.threshold_m,
        threshold_n: authority.threshold_n,
        signature_count: authority.signature_count,
    };
    proof.authority = Some(authority_proof.clone());

    if !authority_proof.threshold_met() {
        // Degrades to G0: authority materialized but threshold not reached.
        return Ok(proof);
    }
    proof.level = GovernanceLevel::G1;

    let Some(outcome) = outcome else {
        return Ok(proof);
    };

    let computed_hash = canonical_hash(&outcome.intent_payload)
        .map_err(|e| ProofError::Malformed(format!("outcome payload canonicalization: {e}")))?;
    let hash_matches = computed_hash == outcome.committed_outcome_hash;
    let within_replay_window =
        outcome.evaluated_at >= outcome.created_at && outcome.evaluated_at <= outcome.expires_at;
    let binding_enforced = hash_matches && within_replay_window;

    proof.outcome = Some(OutcomeProof {
        outcome_type: outcome.outcome_type.clone(),
        outcome_hash: computed_hash,
        binding_enforced,
    });

    if binding_enforced {
        proof.level = GovernanceLevel::G2;
    }

    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{L1Proof, L2Proof, L3Proof, SourcePartition};
    use certen_chain_client::{Receipt, ReceiptEntry};
    use serde_json::json;

    fn dummy_chained_proof(verified: bool) -> ChainedProof {
        let leaf = Hash::from_bytes(b"leaf");
        let sibling = Hash::from_bytes(b"sib");
        let anchor = Hash::from_parts(&[leaf.as_bytes(), sibling.as_bytes()]);
        let receipt = Receipt {
            start: leaf,
            anchor,
            entries: vec![ReceiptEntry { hash: sibling, right: true }],
            local_block: Some(5),
            next: None,
        };
        ChainedProof {
            source_partition: SourcePartition("bvn1".into()),
            l1: L1Proof {
                source_tx_hash: leaf,
                receipt: receipt.clone(),
                bvn_root_chain_anchor: anchor,
                bvn_mbi: 5,
            },
            l2: Some(L2Proof {
                root_receipt: receipt.clone(),
                bpt_receipt: receipt.clone(),
                dn_index: 1,
                dn_mbi: 10,
                bvn_state_tree_anchor: anchor,
            }),
            l3: L3Proof {
                root_receipt: receipt.clone(),
                bpt_receipt: receipt,
                dn_root_index: 2,
                dn_final_mbi: 20,
                dn_state_tree_anchor: anchor,
            },
            bvn_consensus_verified: verified,
            dn_consensus_verified: verified,
        }
    }

    #[test]
    fn rejects_unverified_chained_proof() {
        let chained = dummy_chained_proof(false);
        let err = build_governance_proof(&chained, 1000, None, None).unwrap_err();
        assert!(matches!(err, ProofError::Invalid(_)));
    }

    #[test]
    fn g0_only_without_authority() {
        let chained = dummy_chained_proof(true);
        let proof = build_governance_proof(&chained, 1000, None, None).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G0);
        assert!(proof.authority.is_none());
    }

    #[test]
    fn g1_when_threshold_met_without_outcome() {
        let chained = dummy_chained_proof(true);
        let authority = AuthorityMaterialization {
            authority_url: "acc://acme/book/1".into(),
            key_page_count: 1,
            threshold_m: 2,
            threshold_n: 3,
            signature_count: 2,
        };
        let proof = build_governance_proof(&chained, 1000, Some(&authority), None).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G1);
    }

    #[test]
    fn degrades_to_g0_when_threshold_not_met() {
        let chained = dummy_chained_proof(true);
        let authority = AuthorityMaterialization {
            authority_url: "acc://acme/book/1".into(),
            key_page_count: 1,
            threshold_m: 2,
            threshold_n: 3,
            signature_count: 1,
        };
        let proof = build_governance_proof(&chained, 1000, Some(&authority), None).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G0);
        assert!(proof.authority.is_some());
    }

    #[test]
    fn g2_when_outcome_binds_and_window_is_honored() {
        let chained = dummy_chained_proof(true);
        let authority = AuthorityMaterialization {
            authority_url: "acc://acme/book/1".into(),
            key_page_count: 1,
            threshold_m: 1,
            threshold_n: 1,
            signature_count: 1,
        };
        let payload = json!({"amount": 10, "to": "acc://bob/tokens"});
        let committed_hash = canonical_hash(&payload).unwrap();
        let outcome = OutcomeMaterialization {
            outcome_type: "transfer".into(),
            intent_payload: payload,
            committed_outcome_hash: committed_hash,
            created_at: 100,
            expires_at: 200,
            evaluated_at: 150,
        };
        let proof =
            build_governance_proof(&chained, 1000, Some(&authority), Some(&outcome)).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G2);
        assert!(proof.outcome.unwrap().binding_enforced);
    }

    #[test]
    fn degrades_to_g1_when_replay_window_expired() {
        let chained = dummy_chained_proof(true);
        let authority = AuthorityMaterialization {
            authority_url: "acc://acme/book/1".into(),
            key_page_count: 1,
            threshold_m: 1,
            threshold_n: 1,
            signature_count: 1,
        };
        let payload = json!({"amount": 10});
        let committed_hash = canonical_hash(&payload).unwrap();
        let outcome = OutcomeMaterialization {
            outcome_type: "transfer".into(),
            intent_payload: payload,
            committed_outcome_hash: committed_hash,
            created_at: 100,
            expires_at: 200,
            evaluated_at: 300,
        };
        let proof =
            build_governance_proof(&chained, 1000, Some(&authority), Some(&outcome)).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G1);
        assert!(!proof.outcome.unwrap().binding_enforced);
    }

    #[test]
    fn degrades_to_g1_when_outcome_hash_mismatches() {
        let chained = dummy_chained_proof(true);
        let authority = AuthorityMaterialization {
            authority_url: "acc://acme/book/1".into(),
            key_page_count: 1,
            threshold_m: 1,
            threshold_n: 1,
            signature_count: 1,
        };
        let outcome = OutcomeMaterialization {
            outcome_type: "transfer".into(),
            intent_payload: json!({"amount": 10}),
            committed_outcome_hash: Hash::from_bytes(b"wrong"),
            created_at: 100,
            expires_at: 200,
            evaluated_at: 150,
        };
        let proof =
            build_governance_proof(&chained, 1000, Some(&authority), Some(&outcome)).unwrap();
        assert_eq!(proof.level, GovernanceLevel::G1);
    }
}
