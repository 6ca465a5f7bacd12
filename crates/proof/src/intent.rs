//! The discovered intent: the four raw JSON blobs plus routing metadata
//! that a proof build starts from (spec §3).

use crate::error::ProofError;
use certen_canonical::{operation_id, OperationBlobs};
use certen_types::Hash;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which cadence a proof follows once built: batched on a timer, or
/// committed as a singleton the moment it's ready.
///
/// This is a required, non-nullable field on [`Intent`] — spec §9 Open
/// Question 3 names a `"urgent"`-string heuristic observed in the field;
/// this implementation does not carry it. An intent that cannot determine
/// its class is rejected as [`ProofError::Invalid`] at discovery, never
/// defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofClass {
    /// Batched on the cadence ticker (spec §4.E).
    OnCadence,
    /// Committed as a standalone singleton batch.
    OnDemand,
}

/// A discovered intent: four raw JSON blobs, stored verbatim as discovered
/// (spec §3 invariant — canonicalization happens only at commitment time),
/// plus the routing metadata needed to locate and build its proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// The intent payload itself, as discovered (not canonicalized).
    pub intent_blob: Value,
    /// Cross-chain routing metadata, as discovered.
    pub cross_chain_blob: Value,
    /// Governance/authority metadata, as discovered.
    pub governance_blob: Value,
    /// Replay-window metadata, as discovered.
    pub replay_blob: Value,

    /// The source account URL the intent's transaction was submitted to.
    pub source_account_url: String,
    /// The source transaction hash.
    pub source_tx_hash: Hash,
    /// The source chain sub-partition (a BVN name, or `"dn"`/`"directory"`).
    pub source_sub_partition: String,
    /// The organization this intent belongs to, for multi-tenant routing.
    pub organization_id: String,
    /// Batching cadence class. Required; see [`ProofClass`].
    pub proof_class: ProofClass,
}

impl Intent {
    /// The 32-byte operation ID: `SHA-256` over the canonicalized
    /// concatenation of all four blobs, in fixed order (spec §3/§4.D).
    ///
    /// Computed fresh each call rather than cached on the struct, since the
    /// blobs are stored verbatim and may only be canonicalized once, at
    /// commitment time — this is that one canonicalization.
    pub fn operation_id(&self) -> Result<Hash, ProofError> {
        let blobs = OperationBlobs {
            intent: &self.intent_blob,
            cross_chain: &self.cross_chain_blob,
            governance: &self.governance_blob,
            replay: &self.replay_blob,
        };
        operation_id(&blobs)
            .map_err(|e| ProofError::Malformed(format!("operation id canonicalization: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_intent() -> Intent {
        Intent {
            intent_blob: json!({"amount": 10}),
            cross_chain_blob: json!({"target_chain": "ethereum"}),
            governance_blob: json!({"authority": "acc://acme/book/1"}),
            replay_blob: json!({"created_at": 1, "expires_at": 2}),
            source_account_url: "acc://acme/tokens".into(),
            source_tx_hash: Hash::from_bytes(b"tx"),
            source_sub_partition: "bvn1".into(),
            organization_id: "acme".into(),
            proof_class: ProofClass::OnCadence,
        }
    }

    #[test]
    fn operation_id_is_stable() {
        let intent = sample_intent();
        assert_eq!(intent.operation_id().unwrap(), intent.operation_id().unwrap());
    }

    #[test]
    fn operation_id_differs_on_blob_change() {
        let mut a = sample_intent();
        let b = sample_intent();
        a.intent_blob = json!({"amount": 999});
        assert_ne!(a.operation_id().unwrap(), b.operation_id().unwrap());
    }

    #[test]
    fn proof_class_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProofClass::OnDemand).unwrap(),
            "\"on_demand\""
        );
    }
}
