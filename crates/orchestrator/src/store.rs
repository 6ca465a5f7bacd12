//! Relational persistence for every entity named in spec §4.H/§6.
//!
//! Grounded on the chain-anchor `other_examples` file's `PgPool`-driven
//! query style, generalized from its ad hoc tables into the full schema
//! this engine's entities need. Queries are built with `sqlx::query`/
//! `query_as` bound at runtime rather than the `query!` macros, since those
//! need a live database or an offline query cache at compile time that
//! this workspace doesn't carry.

use crate::artifact::{ArtifactStatus, ProofArtifact};
use crate::custody::{self, ActorType, CustodyEvent};
use crate::cycle::{CycleLevel, ProofCycleCompletion};
use crate::error::OrchestratorError;
use certen_anchor::{ChainExecutionResult, ChainPlatform, ExecutionStatus};
use certen_batch::{Batch, BatchStatus, BatchTransaction, BatchType, ClosedBatch};
use certen_anchor::{AnchorRecord, AnchorRecordStatus, AnchorReference};
use certen_types::{AnchorId, BatchId, Hash, MerklePath, ProofId, PublicKey, Signature};
use sqlx::{PgPool, Row};

/// Long-running scans never return more than this many rows unless a
/// smaller `limit` is requested (spec §4.H "bound their result set").
pub const DEFAULT_SCAN_LIMIT: i64 = 50;
/// Hard ceiling on any single scan, regardless of requested `limit`.
pub const MAX_SCAN_LIMIT: i64 = 10_000;

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_SCAN_LIMIT).clamp(1, MAX_SCAN_LIMIT)
}

fn batch_type_str(t: BatchType) -> &'static str {
    match t {
        BatchType::OnCadence => "on_cadence",
        BatchType::OnDemand => "on_demand",
    }
}

fn batch_type_from_str(s: &str) -> Result<BatchType, OrchestratorError> {
    match s {
        "on_cadence" => Ok(BatchType::OnCadence),
        "on_demand" => Ok(BatchType::OnDemand),
        other => Err(OrchestratorError::Malformed(format!(
            "unknown batch_type {other:?}"
        ))),
    }
}

fn batch_status_str(s: BatchStatus) -> &'static str {
    match s {
        BatchStatus::Pending => "pending",
        BatchStatus::Closed => "closed",
        BatchStatus::Anchoring => "anchoring",
        BatchStatus::Anchored => "anchored",
        BatchStatus::WaitingForConfirmations => "waiting_for_confirmations",
        BatchStatus::Confirmed => "confirmed",
        BatchStatus::Failed => "failed",
    }
}

fn batch_status_from_str(s: &str) -> Result<BatchStatus, OrchestratorError> {
    match s {
        "pending" => Ok(BatchStatus::Pending),
        "closed" => Ok(BatchStatus::Closed),
        "anchoring" => Ok(BatchStatus::Anchoring),
        "anchored" => Ok(BatchStatus::Anchored),
        "waiting_for_confirmations" => Ok(BatchStatus::WaitingForConfirmations),
        "confirmed" => Ok(BatchStatus::Confirmed),
        "failed" => Ok(BatchStatus::Failed),
        other => Err(OrchestratorError::Malformed(format!(
            "unknown batch status {other:?}"
        ))),
    }
}

fn platform_str(p: ChainPlatform) -> &'static str {
    p.as_str()
}

fn platform_from_str(s: &str) -> Result<ChainPlatform, OrchestratorError> {
    match s {
        "ethereum" => Ok(ChainPlatform::Ethereum),
        "solana" => Ok(ChainPlatform::Solana),
        "cosmos" => Ok(ChainPlatform::Cosmos),
        other => Err(OrchestratorError::Malformed(format!(
            "unknown chain platform {other:?}"
        ))),
    }
}

fn execution_status_str(s: ExecutionStatus) -> &'static str {
    match s {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::Success => "success",
        ExecutionStatus::Failed => "failed",
    }
}

fn execution_status_from_str(s: &str) -> Result<ExecutionStatus, OrchestratorError> {
    match s {
        "pending" => Ok(ExecutionStatus::Pending),
        "success" => Ok(ExecutionStatus::Success),
        "failed" => Ok(ExecutionStatus::Failed),
        other => Err(OrchestratorError::Malformed(format!(
            "unknown execution status {other:?}"
        ))),
    }
}

/// The orchestrator's persistence handle: one pool, every table.
#[derive(Clone)]
pub struct OrchestratorStore {
    pool: PgPool,
}

impl OrchestratorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -- proof_artifacts -----------------------------------------------

    pub async fn insert_artifact(&self, artifact: &ProofArtifact) -> Result<(), OrchestratorError> {
        sqlx::query(
            "INSERT INTO proof_artifacts
             (proof_id, proof_type, proof_version, source_tx_hash, artifact_json,
              artifact_hash, status, batch_id, anchor_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(artifact.proof_id.as_uuid())
        .bind(&artifact.proof_type)
        .bind(artifact.proof_version as i32)
        .bind(artifact.source_tx_hash.as_bytes().as_slice())
        .bind(&artifact.artifact_json)
        .bind(artifact.artifact_hash.as_bytes().as_slice())
        .bind(artifact.status.as_str())
        .bind(artifact.batch_id.map(|b| b.as_uuid()))
        .bind(artifact.anchor_id.map(|a| a.as_uuid()))
        .bind(artifact.created_at)
        .bind(artifact.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_artifact(&self, proof_id: ProofId) -> Result<ProofArtifact, OrchestratorError> {
        let row = sqlx::query(
            "SELECT proof_id, proof_type, proof_version, source_tx_hash, artifact_json,
                    artifact_hash, status, batch_id, anchor_id, created_at, updated_at
             FROM proof_artifacts WHERE proof_id = $1",
        )
        .bind(proof_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("artifact {proof_id}")))?;

        row_to_artifact(&row)
    }

    /// Move an artifact to `next`, validating the transition, and append a
    /// custody event describing it — all within one transaction, holding a
    /// row lock on the artifact for the duration (spec §5 "hash-chain
    /// ordering ... enforced at insert time under a row-level lock").
    pub async fn transition_artifact(
        &self,
        proof_id: ProofId,
        next: ArtifactStatus,
        actor_type: ActorType,
        actor_id: &str,
        event_details: serde_json::Value,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM proof_artifacts WHERE proof_id = $1 FOR UPDATE")
            .bind(proof_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("artifact {proof_id}")))?;
        let current = ArtifactStatus::from_str(row.try_get::<String, _>("status")?.as_str())?;
        current.validate_transition(next)?;

        sqlx::query("UPDATE proof_artifacts SET status = $1, updated_at = $2 WHERE proof_id = $3")
            .bind(next.as_str())
            .bind(now)
            .bind(proof_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let previous_hash = last_custody_hash(&mut tx, proof_id).await?;
        let event = custody::append(
            proof_id,
            format!("status:{}", next.as_str()),
            actor_type,
            actor_id,
            previous_hash,
            event_details,
            now,
        )?;
        insert_custody_event(&mut tx, &event).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn scan_artifacts_by_status(
        &self,
        status: ArtifactStatus,
        limit: Option<i64>,
    ) -> Result<Vec<ProofArtifact>, OrchestratorError> {
        let rows = sqlx::query(
            "SELECT proof_id, proof_type, proof_version, source_tx_hash, artifact_json,
                    artifact_hash, status, batch_id, anchor_id, created_at, updated_at
             FROM proof_artifacts WHERE status = $1 ORDER BY created_at LIMIT $2",
        )
        .bind(status.as_str())
        .bind(clamp_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_artifact).collect()
    }

    // -- batches ---------------------------------------------------------

    /// Persist a just-closed batch and its leaves atomically (spec §5:
    /// "close-batch + write-paths ... use a single transaction").
    pub async fn commit_closed_batch(&self, closed: &ClosedBatch) -> Result<(), OrchestratorError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO batches (batch_id, batch_type, merkle_root, tx_count, status,
                                   window_start, window_end)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(closed.batch.batch_id.as_uuid())
        .bind(batch_type_str(closed.batch.batch_type))
        .bind(closed.batch.merkle_root.as_bytes().as_slice())
        .bind(closed.batch.tx_count as i32)
        .bind(batch_status_str(closed.batch.status))
        .bind(closed.batch.window_start)
        .bind(closed.batch.window_end)
        .execute(&mut *tx)
        .await?;

        for leaf in &closed.transactions {
            let path_json = serde_json::to_value(&leaf.merkle_path).map_err(|e| {
                OrchestratorError::Malformed(format!("merkle_path serialization: {e}"))
            })?;
            sqlx::query(
                "INSERT INTO batch_transactions
                 (batch_id, tree_index, merkle_path, leaf_hash, proof_id, source_tx_hash)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(leaf.batch_id.as_uuid())
            .bind(leaf.tree_index as i32)
            .bind(path_json)
            .bind(leaf.leaf_hash.as_bytes().as_slice())
            .bind(leaf.proof_id.as_uuid())
            .bind(leaf.source_tx_hash.as_bytes().as_slice())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_batch(&self, batch_id: BatchId) -> Result<Batch, OrchestratorError> {
        let row = sqlx::query(
            "SELECT batch_id, batch_type, merkle_root, tx_count, status, window_start, window_end
             FROM batches WHERE batch_id = $1",
        )
        .bind(batch_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("batch {batch_id}")))?;
        row_to_batch(&row)
    }

    pub async fn get_batch_transactions(
        &self,
        batch_id: BatchId,
    ) -> Result<Vec<BatchTransaction>, OrchestratorError> {
        let rows = sqlx::query(
            "SELECT batch_id, tree_index, merkle_path, leaf_hash, proof_id, source_tx_hash
             FROM batch_transactions WHERE batch_id = $1 ORDER BY tree_index",
        )
        .bind(batch_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let merkle_path: serde_json::Value = row.try_get("merkle_path")?;
                let merkle_path: MerklePath = serde_json::from_value(merkle_path)
                    .map_err(|e| OrchestratorError::Malformed(format!("merkle_path: {e}")))?;
                Ok(BatchTransaction {
                    batch_id: BatchId::from_uuid(row.try_get("batch_id")?),
                    tree_index: row.try_get::<i32, _>("tree_index")? as u32,
                    merkle_path,
                    leaf_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("leaf_hash")?),
                    proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
                    source_tx_hash: Hash::from_hash_bytes(
                        &row.try_get::<Vec<u8>, _>("source_tx_hash")?,
                    ),
                })
            })
            .collect()
    }

    // -- anchor_records / anchor_references --------------------------------

    pub async fn insert_anchor_record(
        &self,
        record: &AnchorRecord,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        sqlx::query(
            "INSERT INTO anchor_records (anchor_id, batch_id, platform, tx_hash, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.anchor_id.as_uuid())
        .bind(record.batch_id.as_uuid())
        .bind(record.platform.as_str())
        .bind(&record.tx_hash)
        .bind(record.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_anchor_record_status(
        &self,
        anchor_id: AnchorId,
        status: AnchorRecordStatus,
    ) -> Result<(), OrchestratorError> {
        sqlx::query("UPDATE anchor_records SET status = $1 WHERE anchor_id = $2")
            .bind(status.as_str())
            .bind(anchor_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_anchor_record(
        &self,
        anchor_id: AnchorId,
    ) -> Result<AnchorRecord, OrchestratorError> {
        let row = sqlx::query(
            "SELECT anchor_id, batch_id, platform, tx_hash, status
             FROM anchor_records WHERE anchor_id = $1",
        )
        .bind(anchor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("anchor record {anchor_id}")))?;
        row_to_anchor_record(&row)
    }

    /// Record a proof's governance-proof submission tx against an
    /// already-registered anchor (spec §4.H `anchor_references`).
    pub async fn insert_anchor_reference(
        &self,
        reference: &AnchorReference,
    ) -> Result<(), OrchestratorError> {
        sqlx::query(
            "INSERT INTO anchor_references (anchor_id, proof_id, tx_hash)
             VALUES ($1, $2, $3)
             ON CONFLICT (anchor_id, proof_id) DO UPDATE SET tx_hash = EXCLUDED.tx_hash",
        )
        .bind(reference.anchor_id.as_uuid())
        .bind(reference.proof_id.as_uuid())
        .bind(&reference.tx_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn anchor_reference_for_proof(
        &self,
        anchor_id: AnchorId,
        proof_id: ProofId,
    ) -> Result<Option<AnchorReference>, OrchestratorError> {
        let row = sqlx::query(
            "SELECT anchor_id, proof_id, tx_hash FROM anchor_references
             WHERE anchor_id = $1 AND proof_id = $2",
        )
        .bind(anchor_id.as_uuid())
        .bind(proof_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_anchor_reference).transpose()
    }

    // -- validator_set_snapshots ------------------------------------------

    pub async fn insert_snapshot(
        &self,
        snapshot: &certen_attestation::ValidatorSetSnapshot,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        let validators_json = serde_json::to_value(&snapshot.validators)
            .map_err(|e| OrchestratorError::Malformed(format!("validators: {e}")))?;
        sqlx::query(
            "INSERT INTO validator_set_snapshots (snapshot_hash, validators, total_weight, recorded_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (snapshot_hash) DO NOTHING",
        )
        .bind(snapshot.snapshot_hash.as_bytes().as_slice())
        .bind(validators_json)
        .bind(snapshot.total_weight() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record one validator's attestation. Idempotent: a duplicate
    /// submission from the same validator for the same message is a no-op
    /// (spec §4.F "duplicate submissions ... are idempotent").
    pub async fn insert_attestation(
        &self,
        attestation: &certen_attestation::Attestation,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        let scheme = match attestation.scheme {
            certen_attestation::Scheme::Bls12381 => "bls12381",
            certen_attestation::Scheme::Ed25519 => "ed25519",
        };
        let public_key = serde_json::to_value(&attestation.public_key)
            .map_err(|e| OrchestratorError::Malformed(format!("public_key: {e}")))?;
        let signature = serde_json::to_value(&attestation.signature)
            .map_err(|e| OrchestratorError::Malformed(format!("signature: {e}")))?;

        sqlx::query(
            "INSERT INTO unified_attestations
             (scheme, validator_id, public_key, message_hash, signature, weight, submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (validator_id, message_hash) DO NOTHING",
        )
        .bind(scheme)
        .bind(attestation.validator_id.as_uuid())
        .bind(public_key)
        .bind(attestation.message_hash.as_bytes().as_slice())
        .bind(signature)
        .bind(attestation.weight as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn attestations_for_message(
        &self,
        message_hash: Hash,
    ) -> Result<Vec<certen_attestation::Attestation>, OrchestratorError> {
        let rows = sqlx::query(
            "SELECT scheme, validator_id, public_key, message_hash, signature, weight
             FROM unified_attestations WHERE message_hash = $1",
        )
        .bind(message_hash.as_bytes().as_slice())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let scheme = match row.try_get::<String, _>("scheme")?.as_str() {
                    "bls12381" => certen_attestation::Scheme::Bls12381,
                    "ed25519" => certen_attestation::Scheme::Ed25519,
                    other => {
                        return Err(OrchestratorError::Malformed(format!(
                            "unknown scheme {other:?}"
                        )))
                    }
                };
                let public_key: serde_json::Value = row.try_get("public_key")?;
                let public_key: PublicKey = serde_json::from_value(public_key)
                    .map_err(|e| OrchestratorError::Malformed(format!("public_key: {e}")))?;
                let signature: serde_json::Value = row.try_get("signature")?;
                let signature: Signature = serde_json::from_value(signature)
                    .map_err(|e| OrchestratorError::Malformed(format!("signature: {e}")))?;
                Ok(certen_attestation::Attestation {
                    scheme,
                    validator_id: certen_types::ValidatorId::from_uuid(
                        row.try_get("validator_id")?,
                    ),
                    public_key,
                    message_hash: Hash::from_hash_bytes(
                        &row.try_get::<Vec<u8>, _>("message_hash")?,
                    ),
                    signature,
                    weight: row.try_get::<i64, _>("weight")? as u64,
                })
            })
            .collect()
    }

    // -- aggregated_attestations -------------------------------------------

    pub async fn insert_aggregated_attestation(
        &self,
        agg: &certen_attestation::AggregatedAttestation,
        now: i64,
    ) -> Result<(), OrchestratorError> {
        let scheme = match agg.scheme {
            certen_attestation::Scheme::Bls12381 => "bls12381",
            certen_attestation::Scheme::Ed25519 => "ed25519",
        };
        let participants = serde_json::to_value(&agg.participants)
            .map_err(|e| OrchestratorError::Malformed(format!("participants: {e}")))?;
        let bitfield = serde_json::to_value(&agg.bitfield)
            .map_err(|e| OrchestratorError::Malformed(format!("bitfield: {e}")))?;
        let agg_sig = agg
            .aggregate_signature
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| OrchestratorError::Malformed(format!("aggregate_signature: {e}")))?;
        let agg_pk = agg
            .aggregate_public_key
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| OrchestratorError::Malformed(format!("aggregate_public_key: {e}")))?;

        sqlx::query(
            "INSERT INTO aggregated_attestations
             (message_hash, scheme, participants, bitfield, total_weight, achieved_weight,
              threshold_weight, threshold_met, message_consistency_valid,
              aggregate_signature, aggregate_public_key, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (message_hash) DO UPDATE SET
                 participants = EXCLUDED.participants,
                 bitfield = EXCLUDED.bitfield,
                 achieved_weight = EXCLUDED.achieved_weight,
                 threshold_met = EXCLUDED.threshold_met,
                 message_consistency_valid = EXCLUDED.message_consistency_valid,
                 aggregate_signature = EXCLUDED.aggregate_signature,
                 aggregate_public_key = EXCLUDED.aggregate_public_key",
        )
        .bind(agg.message_hash.as_bytes().as_slice())
        .bind(scheme)
        .bind(participants)
        .bind(bitfield)
        .bind(agg.total_weight as i64)
        .bind(agg.achieved_weight as i64)
        .bind(agg.threshold_weight as i64)
        .bind(agg.threshold_met)
        .bind(agg.message_consistency_valid)
        .bind(agg_sig)
        .bind(agg_pk)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- chain_execution_results -------------------------------------------

    /// Insert the next result in a proof's execution-result hash chain,
    /// verifying linkage under a per-proof row lock (spec §4.G/§5).
    pub async fn insert_execution_result(
        &self,
        result: &ChainExecutionResult,
    ) -> Result<(), OrchestratorError> {
        let mut tx = self.pool.begin().await?;

        // Per-proof serialization point: an advisory lock keyed on the
        // proof id, since there may be no prior row to lock with
        // `SELECT ... FOR UPDATE` when inserting the genesis result.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(result.proof_id.as_uuid().to_string())
            .execute(&mut *tx)
            .await?;

        let prior_row = sqlx::query(
            "SELECT proof_id, sequence_number, chain_platform, chain_id, tx_hash, block_number,
                    status, confirmations, required_confirmations, is_finalized, result_hash,
                    previous_result_hash, finalized_at
             FROM chain_execution_results
             WHERE proof_id = $1
             ORDER BY sequence_number DESC
             LIMIT 1",
        )
        .bind(result.proof_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let prior = prior_row.as_ref().map(row_to_execution_result).transpose()?;
        result.verify_linkage(prior.as_ref())?;

        sqlx::query(
            "INSERT INTO chain_execution_results
             (proof_id, sequence_number, chain_platform, chain_id, tx_hash, block_number,
              status, confirmations, required_confirmations, is_finalized, result_hash,
              previous_result_hash, finalized_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(result.proof_id.as_uuid())
        .bind(result.sequence_number as i64)
        .bind(platform_str(result.chain_platform))
        .bind(&result.chain_id)
        .bind(&result.tx_hash)
        .bind(result.block_number.map(|b| b as i64))
        .bind(execution_status_str(result.status))
        .bind(result.confirmations as i64)
        .bind(result.required_confirmations as i64)
        .bind(result.is_finalized)
        .bind(result.result_hash.as_bytes().as_slice())
        .bind(result.previous_result_hash.as_bytes().as_slice())
        .bind(result.finalized_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn latest_execution_result(
        &self,
        proof_id: ProofId,
    ) -> Result<Option<ChainExecutionResult>, OrchestratorError> {
        let row = sqlx::query(
            "SELECT proof_id, sequence_number, chain_platform, chain_id, tx_hash, block_number,
                    status, confirmations, required_confirmations, is_finalized, result_hash,
                    previous_result_hash, finalized_at
             FROM chain_execution_results
             WHERE proof_id = $1
             ORDER BY sequence_number DESC
             LIMIT 1",
        )
        .bind(proof_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_execution_result).transpose()
    }

    // -- proof_cycle_completions --------------------------------------------

    /// Record a level's completion for `proof_id`, creating the row if
    /// absent, under a per-row lock so concurrent level completions don't
    /// race the read-modify-write (spec §4.H/§5).
    pub async fn record_cycle_level(
        &self,
        proof_id: ProofId,
        level: CycleLevel,
        hash: Hash,
        now: i64,
    ) -> Result<ProofCycleCompletion, OrchestratorError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT proof_id, chained_anchor_hash, governance_hash, attestation_hash,
                    external_execution_hash, all_levels_complete
             FROM proof_cycle_completions WHERE proof_id = $1 FOR UPDATE",
        )
        .bind(proof_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let mut completion = match existing {
            Some(row) => row_to_cycle_completion(&row)?,
            None => ProofCycleCompletion::new(proof_id),
        };
        completion.record(level, hash);

        sqlx::query(
            "INSERT INTO proof_cycle_completions
             (proof_id, chained_anchor_hash, governance_hash, attestation_hash,
              external_execution_hash, all_levels_complete, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (proof_id) DO UPDATE SET
                 chained_anchor_hash = EXCLUDED.chained_anchor_hash,
                 governance_hash = EXCLUDED.governance_hash,
                 attestation_hash = EXCLUDED.attestation_hash,
                 external_execution_hash = EXCLUDED.external_execution_hash,
                 all_levels_complete = EXCLUDED.all_levels_complete,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(proof_id.as_uuid())
        .bind(completion.chained_anchor_hash.map(|h| h.as_bytes().to_vec()))
        .bind(completion.governance_hash.map(|h| h.as_bytes().to_vec()))
        .bind(completion.attestation_hash.map(|h| h.as_bytes().to_vec()))
        .bind(
            completion
                .external_execution_hash
                .map(|h| h.as_bytes().to_vec()),
        )
        .bind(completion.all_levels_complete)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(completion)
    }

    // -- custody_chain_events -----------------------------------------------

    pub async fn custody_chain_for(
        &self,
        proof_id: ProofId,
    ) -> Result<Vec<CustodyEvent>, OrchestratorError> {
        let rows = sqlx::query(
            "SELECT proof_id, event_type, actor_type, actor_id, previous_hash, current_hash,
                    event_details, recorded_at
             FROM custody_chain_events WHERE proof_id = $1 ORDER BY id",
        )
        .bind(proof_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_custody_event).collect()
    }
}

async fn last_custody_hash(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    proof_id: ProofId,
) -> Result<Hash, OrchestratorError> {
    let row = sqlx::query(
        "SELECT current_hash FROM custody_chain_events
         WHERE proof_id = $1 ORDER BY id DESC LIMIT 1 FOR UPDATE",
    )
    .bind(proof_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;
    match row {
        Some(row) => Ok(Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("current_hash")?)),
        None => Ok(Hash::ZERO),
    }
}

async fn insert_custody_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event: &CustodyEvent,
) -> Result<(), OrchestratorError> {
    let actor_type = match event.actor_type {
        ActorType::Orchestrator => "orchestrator",
        ActorType::Builder => "builder",
        ActorType::Attestation => "attestation",
        ActorType::Observer => "observer",
    };
    sqlx::query(
        "INSERT INTO custody_chain_events
         (proof_id, event_type, actor_type, actor_id, previous_hash, current_hash,
          event_details, recorded_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(event.proof_id.as_uuid())
    .bind(&event.event_type)
    .bind(actor_type)
    .bind(&event.actor_id)
    .bind(event.previous_hash.as_bytes().as_slice())
    .bind(event.current_hash.as_bytes().as_slice())
    .bind(&event.event_details)
    .bind(event.recorded_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn row_to_artifact(row: &sqlx::postgres::PgRow) -> Result<ProofArtifact, OrchestratorError> {
    Ok(ProofArtifact {
        proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
        proof_type: row.try_get("proof_type")?,
        proof_version: row.try_get::<i32, _>("proof_version")? as u32,
        source_tx_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("source_tx_hash")?),
        artifact_json: row.try_get("artifact_json")?,
        artifact_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("artifact_hash")?),
        status: ArtifactStatus::from_str(row.try_get::<String, _>("status")?.as_str())?,
        batch_id: row
            .try_get::<Option<uuid::Uuid>, _>("batch_id")?
            .map(BatchId::from_uuid),
        anchor_id: row
            .try_get::<Option<uuid::Uuid>, _>("anchor_id")?
            .map(AnchorId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn anchor_record_status_from_str(s: &str) -> Result<AnchorRecordStatus, OrchestratorError> {
    match s {
        "pending" => Ok(AnchorRecordStatus::Pending),
        "confirmed" => Ok(AnchorRecordStatus::Confirmed),
        "failed" => Ok(AnchorRecordStatus::Failed),
        other => Err(OrchestratorError::Malformed(format!(
            "unknown anchor record status {other:?}"
        ))),
    }
}

fn row_to_anchor_record(row: &sqlx::postgres::PgRow) -> Result<AnchorRecord, OrchestratorError> {
    Ok(AnchorRecord {
        anchor_id: AnchorId::from_uuid(row.try_get("anchor_id")?),
        batch_id: BatchId::from_uuid(row.try_get("batch_id")?),
        platform: platform_from_str(row.try_get::<String, _>("platform")?.as_str())?,
        tx_hash: row.try_get("tx_hash")?,
        status: anchor_record_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
    })
}

fn row_to_anchor_reference(
    row: &sqlx::postgres::PgRow,
) -> Result<AnchorReference, OrchestratorError> {
    Ok(AnchorReference {
        anchor_id: AnchorId::from_uuid(row.try_get("anchor_id")?),
        proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
        tx_hash: row.try_get("tx_hash")?,
    })
}

fn row_to_batch(row: &sqlx::postgres::PgRow) -> Result<Batch, OrchestratorError> {
    Ok(Batch {
        batch_id: BatchId::from_uuid(row.try_get("batch_id")?),
        batch_type: batch_type_from_str(row.try_get::<String, _>("batch_type")?.as_str())?,
        merkle_root: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("merkle_root")?),
        tx_count: row.try_get::<i32, _>("tx_count")? as u32,
        status: batch_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
        window_start: row.try_get("window_start")?,
        window_end: row.try_get("window_end")?,
    })
}

fn row_to_execution_result(
    row: &sqlx::postgres::PgRow,
) -> Result<ChainExecutionResult, OrchestratorError> {
    Ok(ChainExecutionResult {
        proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
        chain_platform: platform_from_str(row.try_get::<String, _>("chain_platform")?.as_str())?,
        chain_id: row.try_get("chain_id")?,
        tx_hash: row.try_get("tx_hash")?,
        block_number: row.try_get::<Option<i64>, _>("block_number")?.map(|b| b as u64),
        status: execution_status_from_str(row.try_get::<String, _>("status")?.as_str())?,
        confirmations: row.try_get::<i64, _>("confirmations")? as u64,
        required_confirmations: row.try_get::<i64, _>("required_confirmations")? as u64,
        is_finalized: row.try_get("is_finalized")?,
        result_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("result_hash")?),
        previous_result_hash: Hash::from_hash_bytes(
            &row.try_get::<Vec<u8>, _>("previous_result_hash")?,
        ),
        sequence_number: row.try_get::<i64, _>("sequence_number")? as u64,
        finalized_at: row.try_get("finalized_at")?,
    })
}

fn row_to_cycle_completion(
    row: &sqlx::postgres::PgRow,
) -> Result<ProofCycleCompletion, OrchestratorError> {
    let opt_hash = |col: &str| -> Result<Option<Hash>, OrchestratorError> {
        Ok(row
            .try_get::<Option<Vec<u8>>, _>(col)?
            .map(|bytes| Hash::from_hash_bytes(&bytes)))
    };
    Ok(ProofCycleCompletion {
        proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
        chained_anchor_hash: opt_hash("chained_anchor_hash")?,
        governance_hash: opt_hash("governance_hash")?,
        attestation_hash: opt_hash("attestation_hash")?,
        external_execution_hash: opt_hash("external_execution_hash")?,
        all_levels_complete: row.try_get("all_levels_complete")?,
    })
}

fn row_to_custody_event(row: &sqlx::postgres::PgRow) -> Result<CustodyEvent, OrchestratorError> {
    let actor_type = match row.try_get::<String, _>("actor_type")?.as_str() {
        "orchestrator" => ActorType::Orchestrator,
        "builder" => ActorType::Builder,
        "attestation" => ActorType::Attestation,
        "observer" => ActorType::Observer,
        other => {
            return Err(OrchestratorError::Malformed(format!(
                "unknown actor_type {other:?}"
            )))
        }
    };
    Ok(CustodyEvent {
        proof_id: ProofId::from_uuid(row.try_get("proof_id")?),
        event_type: row.try_get("event_type")?,
        actor_type,
        actor_id: row.try_get("actor_id")?,
        previous_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("previous_hash")?),
        current_hash: Hash::from_hash_bytes(&row.try_get::<Vec<u8>, _>("current_hash")?),
        event_details: row.try_get("event_details")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}
