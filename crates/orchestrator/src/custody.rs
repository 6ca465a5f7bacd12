//! The custody hash chain: the sole auditable change log for a proof's
//! lifecycle (spec §4.H).

use crate::error::OrchestratorError;
use certen_types::{Hash, ProofId};
use serde::{Deserialize, Serialize};

/// Which actor performed a custody-chain mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// The lifecycle orchestrator itself (status transitions).
    Orchestrator,
    /// A proof or governance builder.
    Builder,
    /// The attestation collector.
    Attestation,
    /// An external-chain observer.
    Observer,
}

/// One custody-chain event: a single mutation of a proof's state, linked to
/// its predecessor by hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyEvent {
    pub proof_id: ProofId,
    pub event_type: String,
    pub actor_type: ActorType,
    pub actor_id: String,
    pub previous_hash: Hash,
    pub current_hash: Hash,
    pub event_details: serde_json::Value,
    pub recorded_at: i64,
}

/// Build the next custody event in a proof's chain.
///
/// `current_hash = SHA-256(previous_hash || canonical(event_details))`. The
/// first event in a chain passes `previous_hash = Hash::ZERO` (spec §4.H:
/// "`previous_hash` of the first event is 32 zero bytes").
pub fn append(
    proof_id: ProofId,
    event_type: impl Into<String>,
    actor_type: ActorType,
    actor_id: impl Into<String>,
    previous_hash: Hash,
    event_details: serde_json::Value,
    now: i64,
) -> Result<CustodyEvent, OrchestratorError> {
    let canonical_details = certen_canonical::canonicalize(&event_details)
        .map_err(|e| OrchestratorError::Malformed(format!("event_details: {e}")))?;

    let mut buf = Vec::with_capacity(32 + canonical_details.len());
    buf.extend_from_slice(previous_hash.as_bytes());
    buf.extend_from_slice(&canonical_details);
    let current_hash = Hash::from_bytes(&buf);

    Ok(CustodyEvent {
        proof_id,
        event_type: event_type.into(),
        actor_type,
        actor_id: actor_id.into(),
        previous_hash,
        current_hash,
        event_details,
        recorded_at: now,
    })
}

/// Verify a proof's whole custody chain, in order: the first event must
/// start from [`Hash::ZERO`], and each event's `current_hash` must
/// recompute from its own `previous_hash` and `event_details`, chained to
/// the next event's `previous_hash`.
pub fn verify_chain(events: &[CustodyEvent]) -> Result<(), OrchestratorError> {
    let mut expected_previous = Hash::ZERO;
    for event in events {
        if event.previous_hash != expected_previous {
            return Err(OrchestratorError::Malformed(format!(
                "custody chain break for proof {} at event {:?}",
                event.proof_id, event.event_type
            )));
        }
        let canonical_details = certen_canonical::canonicalize(&event.event_details)
            .map_err(|e| OrchestratorError::Malformed(format!("event_details: {e}")))?;
        let mut buf = Vec::with_capacity(32 + canonical_details.len());
        buf.extend_from_slice(event.previous_hash.as_bytes());
        buf.extend_from_slice(&canonical_details);
        if Hash::from_bytes(&buf) != event.current_hash {
            return Err(OrchestratorError::Malformed(format!(
                "custody event hash mismatch for proof {} at event {:?}",
                event.proof_id, event.event_type
            )));
        }
        expected_previous = event.current_hash;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn genesis_event_starts_from_zero_hash() {
        let proof_id = ProofId::new();
        let event = append(
            proof_id,
            "created",
            ActorType::Builder,
            "proof-builder-0",
            Hash::ZERO,
            json!({"status": "created"}),
            1_700_000_000,
        )
        .unwrap();
        assert_eq!(event.previous_hash, Hash::ZERO);
        assert_ne!(event.current_hash, Hash::ZERO);
    }

    #[test]
    fn chain_of_events_verifies() {
        let proof_id = ProofId::new();
        let e0 = append(
            proof_id,
            "created",
            ActorType::Builder,
            "builder",
            Hash::ZERO,
            json!({"status": "created"}),
            1,
        )
        .unwrap();
        let e1 = append(
            proof_id,
            "batched",
            ActorType::Orchestrator,
            "orchestrator",
            e0.current_hash,
            json!({"status": "batched"}),
            2,
        )
        .unwrap();
        verify_chain(&[e0, e1]).unwrap();
    }

    #[test]
    fn tampered_event_details_breaks_verification() {
        let proof_id = ProofId::new();
        let mut e0 = append(
            proof_id,
            "created",
            ActorType::Builder,
            "builder",
            Hash::ZERO,
            json!({"status": "created"}),
            1,
        )
        .unwrap();
        e0.event_details = json!({"status": "tampered"});
        assert!(verify_chain(&[e0]).is_err());
    }

    #[test]
    fn out_of_order_events_break_verification() {
        let proof_id = ProofId::new();
        let e0 = append(
            proof_id,
            "created",
            ActorType::Builder,
            "builder",
            Hash::ZERO,
            json!({"status": "created"}),
            1,
        )
        .unwrap();
        let e1 = append(
            proof_id,
            "batched",
            ActorType::Orchestrator,
            "orchestrator",
            e0.current_hash,
            json!({"status": "batched"}),
            2,
        )
        .unwrap();
        assert!(verify_chain(&[e1, e0]).is_err());
    }
}
