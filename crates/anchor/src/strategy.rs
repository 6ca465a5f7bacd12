//! The `ExternalChainStrategy` contract shared by every anchoring platform
//! (spec §4.G).

use crate::error::AnchorError;
use crate::types::{AnchorRequest, ChainExecutionResult, ChainPlatform, ExecutionParams};
use async_trait::async_trait;
use certen_types::{AnchorId, ProofId};

/// Invoked exactly once when a watcher spawned by
/// [`ExternalChainStrategy::observe_transaction_async`] reaches its
/// finality depth.
pub type OnFinalized = Box<dyn FnOnce(ChainExecutionResult) + Send + 'static>;

/// Invoked exactly once when that watcher gives up: the transaction
/// reverted, dropped, or the deadline elapsed first.
pub type OnFailed = Box<dyn FnOnce(AnchorError) + Send + 'static>;

/// One implementation per external chain platform. Every call that talks to
/// the network can fail with [`AnchorError::Unavailable`] (transient) or
/// surface a platform-specific rejection as [`AnchorError::Invalid`] or
/// [`AnchorError::Malformed`].
#[async_trait]
pub trait ExternalChainStrategy: Send + Sync {
    /// Which platform this implementation targets.
    fn platform(&self) -> ChainPlatform;

    /// Submit an anchor-registration transaction, returning the platform's
    /// anchor identifier and the transaction hash that registered it.
    async fn create_anchor(&self, request: &AnchorRequest) -> Result<(AnchorId, String), AnchorError>;

    /// Attach an attested aggregation to an already-registered anchor.
    async fn submit_proof(
        &self,
        anchor_id: AnchorId,
        submission: &crate::types::GovernanceProofSubmission,
    ) -> Result<String, AnchorError>;

    /// Trigger the governance-gated execution path.
    async fn execute_with_governance(
        &self,
        anchor_id: AnchorId,
        params: &ExecutionParams,
    ) -> Result<String, AnchorError>;

    /// Block until `tx_hash` reaches this platform's configured finality
    /// depth (or a deadline elapses), returning the observed result.
    /// `previous` is this proof's last recorded execution result, if any —
    /// the caller owns the hash-chain sequencing, the strategy only reports
    /// what it observed on-chain.
    async fn observe_transaction(
        &self,
        proof_id: ProofId,
        tx_hash: &str,
        previous: Option<&ChainExecutionResult>,
    ) -> Result<ChainExecutionResult, AnchorError>;

    /// Spawn a watcher for `tx_hash` and return immediately. Exactly one of
    /// `on_finalized` / `on_failed` fires once the watcher concludes.
    async fn observe_transaction_async(
        &self,
        proof_id: ProofId,
        tx_hash: String,
        previous: Option<ChainExecutionResult>,
        on_finalized: OnFinalized,
        on_failed: OnFailed,
    );

    /// The confirmation depth this platform requires before a transaction
    /// is considered final.
    fn required_confirmations(&self) -> u64;

    /// The platform's current block/slot height.
    async fn current_block(&self) -> Result<u64, AnchorError>;

    /// Liveness/connectivity check for this strategy's RPC endpoint.
    async fn health_check(&self) -> Result<(), AnchorError>;

    /// Estimate the gas/compute cost of `params` without submitting.
    async fn estimate_gas(&self, params: &ExecutionParams) -> Result<u64, AnchorError>;
}
