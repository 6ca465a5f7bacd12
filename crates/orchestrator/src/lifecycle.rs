//! The lifecycle orchestrator: the sole owner of artifact status
//! transitions (spec §3 "Ownership", §4.H).
//!
//! Builders and observers produce artifacts and results; only this type
//! mutates status fields, always pairing the mutation with a custody event.

use crate::artifact::{ArtifactStatus, ProofArtifact};
use crate::custody::ActorType;
use crate::error::OrchestratorError;
use crate::store::OrchestratorStore;
use certen_anchor::{AnchorRecord, AnchorRecordStatus, AnchorReference, ChainPlatform};
use certen_types::{AnchorId, BatchId, ErrorClass, ProofId};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

/// Retry policy for `Unavailable` errors (spec §7: "Retried with
/// exponential backoff (default 3 attempts, base 2s)").
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying with exponential backoff only while the error's
    /// taxonomy is [`ErrorClass::Unavailable`] (spec §7 "The orchestrator
    /// is the only component that may retry, and only for `Unavailable`").
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && err.taxonomy().is_retryable() => {
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Anything the retry policy can classify. Implemented by every crate's
/// error type via its existing `taxonomy()` method.
pub trait RetryableError {
    fn taxonomy(&self) -> ErrorClass;
}

impl RetryableError for OrchestratorError {
    fn taxonomy(&self) -> ErrorClass {
        OrchestratorError::taxonomy(self)
    }
}
impl RetryableError for certen_proof::ProofError {
    fn taxonomy(&self) -> ErrorClass {
        certen_proof::ProofError::taxonomy(self)
    }
}
impl RetryableError for certen_anchor::AnchorError {
    fn taxonomy(&self) -> ErrorClass {
        certen_anchor::AnchorError::taxonomy(self)
    }
}
impl RetryableError for certen_attestation::AttestationError {
    fn taxonomy(&self) -> ErrorClass {
        certen_attestation::AttestationError::taxonomy(self)
    }
}
impl RetryableError for certen_batch::BatchError {
    fn taxonomy(&self) -> ErrorClass {
        certen_batch::BatchError::taxonomy(self)
    }
}

/// Binds status transitions to custody events across every entity in the
/// proof lifecycle.
pub struct LifecycleOrchestrator {
    store: OrchestratorStore,
    retry: RetryPolicy,
}

impl LifecycleOrchestrator {
    pub fn new(store: OrchestratorStore) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(store: OrchestratorStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &OrchestratorStore {
        &self.store
    }

    /// Persist a freshly built artifact in `Created` status, with a genesis
    /// custody event.
    pub async fn create_artifact(
        &self,
        artifact: &ProofArtifact,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store.insert_artifact(artifact).await?;
        let event = crate::custody::append(
            artifact.proof_id,
            "created",
            ActorType::Builder,
            "proof-builder",
            certen_types::Hash::ZERO,
            json!({"status": "created", "proof_type": artifact.proof_type}),
            now,
        )?;
        self.append_event_standalone(event).await
    }

    /// Move an artifact `created -> batched`, recording which batch it
    /// joined.
    pub async fn mark_batched(
        &self,
        proof_id: ProofId,
        batch_id: BatchId,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .transition_artifact(
                proof_id,
                ArtifactStatus::Batched,
                ActorType::Orchestrator,
                "lifecycle-orchestrator",
                json!({"batch_id": batch_id.as_uuid().to_string()}),
                now,
            )
            .await?;
        sqlx::query("UPDATE proof_artifacts SET batch_id = $1 WHERE proof_id = $2")
            .bind(batch_id.as_uuid())
            .bind(proof_id.as_uuid())
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    /// Register a batch's anchor-creation transaction on a platform (spec
    /// §4.H `anchor_records`): one row per `(batch, platform)`, created once
    /// when `create_anchor` succeeds, ahead of any per-proof submission.
    pub async fn register_anchor(
        &self,
        anchor_id: AnchorId,
        batch_id: BatchId,
        platform: ChainPlatform,
        tx_hash: &str,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .insert_anchor_record(
                &AnchorRecord {
                    anchor_id,
                    batch_id,
                    platform,
                    tx_hash: tx_hash.to_string(),
                    status: AnchorRecordStatus::Pending,
                },
                now,
            )
            .await
    }

    /// Move an artifact `batched -> anchored`, recording this proof's
    /// governance-proof submission tx against the batch's anchor record
    /// (spec §4.H `anchor_references`).
    pub async fn mark_anchored(
        &self,
        proof_id: ProofId,
        anchor_id: AnchorId,
        tx_hash: &str,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .transition_artifact(
                proof_id,
                ArtifactStatus::Anchored,
                ActorType::Orchestrator,
                "lifecycle-orchestrator",
                json!({"anchor_id": anchor_id.as_uuid().to_string(), "tx_hash": tx_hash}),
                now,
            )
            .await?;
        sqlx::query("UPDATE proof_artifacts SET anchor_id = $1 WHERE proof_id = $2")
            .bind(anchor_id.as_uuid())
            .bind(proof_id.as_uuid())
            .execute(self.store.pool())
            .await?;
        self.store
            .insert_anchor_reference(&AnchorReference {
                anchor_id,
                proof_id,
                tx_hash: tx_hash.to_string(),
            })
            .await
    }

    /// Flip a batch's anchor record to `confirmed`/`failed` once its
    /// external-chain execution result reaches finality or gives up.
    pub async fn settle_anchor_record(
        &self,
        anchor_id: AnchorId,
        status: AnchorRecordStatus,
    ) -> Result<(), OrchestratorError> {
        self.store.set_anchor_record_status(anchor_id, status).await
    }

    /// Move an artifact `anchored -> attested`, once the attestation engine
    /// reports threshold met (spec §4.F "Finalization").
    pub async fn mark_attested(
        &self,
        proof_id: ProofId,
        message_hash: certen_types::Hash,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .transition_artifact(
                proof_id,
                ArtifactStatus::Attested,
                ActorType::Attestation,
                "attestation-engine",
                json!({"message_hash": message_hash.to_hex()}),
                now,
            )
            .await
    }

    /// Move an artifact `attested -> verified`, once its external-chain
    /// execution result reaches `is_finalized = true` (spec §8 scenario 6).
    pub async fn mark_verified(
        &self,
        proof_id: ProofId,
        result_hash: certen_types::Hash,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .transition_artifact(
                proof_id,
                ArtifactStatus::Verified,
                ActorType::Observer,
                "execution-observer",
                json!({"result_hash": result_hash.to_hex()}),
                now,
            )
            .await
    }

    /// Move an artifact to `failed` from any non-terminal state, recording
    /// the taxonomy class and a human-readable cause (spec §7 "Malformed
    /// and Threshold immediately mark the artifact failed").
    pub async fn fail_artifact(
        &self,
        proof_id: ProofId,
        taxonomy: ErrorClass,
        cause: &str,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        self.store
            .transition_artifact(
                proof_id,
                ArtifactStatus::Failed,
                ActorType::Orchestrator,
                "lifecycle-orchestrator",
                json!({"taxonomy": format!("{taxonomy:?}"), "cause": cause}),
                now,
            )
            .await
    }

    /// Run `op` under this orchestrator's retry policy, failing the
    /// artifact if the final error is non-retryable (or retries are
    /// exhausted).
    pub async fn with_retry<T, E, F, Fut>(
        &self,
        proof_id: ProofId,
        now: i64,
        op: F,
    ) -> Result<T, OrchestratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + std::fmt::Display,
    {
        match self.retry.run(op).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let taxonomy = err.taxonomy();
                self.fail_artifact(proof_id, taxonomy, &err.to_string(), now)
                    .await
                    .ok();
                Err(OrchestratorError::Unavailable(err.to_string()))
            }
        }
    }

    async fn append_event_standalone(
        &self,
        event: crate::custody::CustodyEvent,
    ) -> Result<(), OrchestratorError> {
        sqlx::query(
            "INSERT INTO custody_chain_events
             (proof_id, event_type, actor_type, actor_id, previous_hash, current_hash,
              event_details, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.proof_id.as_uuid())
        .bind(&event.event_type)
        .bind(match event.actor_type {
            ActorType::Orchestrator => "orchestrator",
            ActorType::Builder => "builder",
            ActorType::Attestation => "attestation",
            ActorType::Observer => "observer",
        })
        .bind(&event.actor_id)
        .bind(event.previous_hash.as_bytes().as_slice())
        .bind(event.current_hash.as_bytes().as_slice())
        .bind(&event.event_details)
        .bind(event.recorded_at)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct FlakyError(ErrorClass);
    impl RetryableError for FlakyError {
        fn taxonomy(&self) -> ErrorClass {
            self.0
        }
    }

    #[tokio::test]
    async fn retries_unavailable_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<u32, FlakyError> = policy
            .run(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FlakyError(ErrorClass::Unavailable))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_unavailable_errors() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<u32, FlakyError> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(FlakyError(ErrorClass::Malformed)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        };
        let attempts = AtomicU32::new(0);
        let result: Result<u32, FlakyError> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(FlakyError(ErrorClass::Unavailable)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
