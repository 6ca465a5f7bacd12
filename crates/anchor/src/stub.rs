//! Placeholder strategy for platforms with no live RPC implementation yet
//! (spec §4.G expansion: Solana and Cosmos are wired only as far as the
//! shared trait, so the orchestrator's multi-platform fan-out can be
//! exercised without a live endpoint). Every call returns `Unavailable`;
//! `health_check` reports the platform as `unimplemented` explicitly
//! rather than silently reporting healthy.

use crate::error::AnchorError;
use crate::strategy::{ExternalChainStrategy, OnFailed, OnFinalized};
use crate::types::{AnchorRequest, ChainExecutionResult, ChainPlatform, ExecutionParams};
use async_trait::async_trait;
use certen_types::{AnchorId, ProofId};

/// A strategy for a platform that has no live implementation wired up yet.
pub struct StubStrategy {
    platform: ChainPlatform,
}

impl StubStrategy {
    /// Construct a stub for `platform`. Panics if `platform` is
    /// [`ChainPlatform::Ethereum`] — that platform has a real
    /// implementation and should never be stubbed.
    pub fn new(platform: ChainPlatform) -> Self {
        assert!(
            !matches!(platform, ChainPlatform::Ethereum),
            "Ethereum has a fully-wired strategy; it should never be stubbed"
        );
        Self { platform }
    }

    fn unavailable(&self, operation: &str) -> AnchorError {
        AnchorError::Unavailable(format!(
            "{} strategy for {} is not implemented",
            self.platform.as_str(),
            operation
        ))
    }
}

#[async_trait]
impl ExternalChainStrategy for StubStrategy {
    fn platform(&self) -> ChainPlatform {
        self.platform
    }

    async fn create_anchor(
        &self,
        _request: &AnchorRequest,
    ) -> Result<(AnchorId, String), AnchorError> {
        Err(self.unavailable("create_anchor"))
    }

    async fn submit_proof(
        &self,
        _anchor_id: AnchorId,
        _submission: &crate::types::GovernanceProofSubmission,
    ) -> Result<String, AnchorError> {
        Err(self.unavailable("submit_proof"))
    }

    async fn execute_with_governance(
        &self,
        _anchor_id: AnchorId,
        _params: &ExecutionParams,
    ) -> Result<String, AnchorError> {
        Err(self.unavailable("execute_with_governance"))
    }

    async fn observe_transaction(
        &self,
        _proof_id: ProofId,
        _tx_hash: &str,
        _previous: Option<&ChainExecutionResult>,
    ) -> Result<ChainExecutionResult, AnchorError> {
        Err(self.unavailable("observe_transaction"))
    }

    async fn observe_transaction_async(
        &self,
        _proof_id: ProofId,
        _tx_hash: String,
        _previous: Option<ChainExecutionResult>,
        _on_finalized: OnFinalized,
        on_failed: OnFailed,
    ) {
        on_failed(self.unavailable("observe_transaction_async"));
    }

    fn required_confirmations(&self) -> u64 {
        0
    }

    async fn current_block(&self) -> Result<u64, AnchorError> {
        Err(self.unavailable("current_block"))
    }

    async fn health_check(&self) -> Result<(), AnchorError> {
        Err(AnchorError::Unavailable(format!(
            "{} strategy is unimplemented",
            self.platform.as_str()
        )))
    }

    async fn estimate_gas(&self, _params: &ExecutionParams) -> Result<u64, AnchorError> {
        Err(self.unavailable("estimate_gas"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_reports_unavailable_for_every_call() {
        let stub = StubStrategy::new(ChainPlatform::Solana);
        assert!(stub.health_check().await.is_err());
        assert!(stub.current_block().await.is_err());
        let request = AnchorRequest {
            batch_id: certen_types::BatchId::new(),
            merkle_root: certen_types::Hash::ZERO,
            tx_count: 1,
        };
        assert!(matches!(
            stub.create_anchor(&request).await,
            Err(AnchorError::Unavailable(_))
        ));
    }

    #[test]
    #[should_panic(expected = "should never be stubbed")]
    fn ethereum_cannot_be_stubbed() {
        StubStrategy::new(ChainPlatform::Ethereum);
    }
}
