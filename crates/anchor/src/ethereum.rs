//! The Ethereum-family (EVM) strategy: the only fully-wired external-chain
//! implementation (spec §4.G expansion). Built on `ethers`, matching the
//! contract surface named in spec §6.

use crate::error::AnchorError;
use crate::strategy::{ExternalChainStrategy, OnFailed, OnFinalized};
use crate::types::{
    AnchorRequest, ChainExecutionResult, ChainPlatform, ExecutionParams, ExecutionStatus,
    GovernanceProofSubmission,
};
use async_trait::async_trait;
use certen_proof::GovernanceLevel;
use certen_types::{AnchorId, ProofId};
use ethers::prelude::*;
use ethers::types::{Address, U256, U64};
use std::sync::Arc;
use std::time::Duration;

abigen!(
    CertenAnchor,
    r#"[
        struct GovernanceProof { string adiURL; bytes32 anchorId; bytes32[] merkleProof; bytes32 keyBookProof; bytes32 roleProof; bytes32 thresholdProof; uint64 timestamp; uint64 expiresAt; bytes[] validatorSignatures; uint64 nonce; uint8 requiredLevel; }
        function createAnchor(bytes32 merkleRoot, uint32 txCount) external returns (bytes32 anchorId)
        function submitProof(bytes32 anchorId, GovernanceProof proof) external
        function executeWithGovernanceProof(address target, uint256 value, bytes data, GovernanceProof proof) external returns (bool)
        function executeGovernanceProofDirect(address target, uint256 value, bytes data, GovernanceProof proof) external returns (bool)
        function batchExecuteWithGovernanceProof(address[] targets, uint256[] values, bytes[] datas, GovernanceProof proof) external returns (bool)
    ]"#
);

type SignerProvider = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Ethereum-family anchoring strategy: one RPC endpoint, one signing
/// wallet, one anchor-registry contract.
pub struct EthereumStrategy {
    client: Arc<SignerProvider>,
    contract_address: Address,
    chain_id: String,
    required_confirmations: u64,
    watch_poll_interval: Duration,
    watch_deadline: Duration,
}

impl EthereumStrategy {
    /// Construct a strategy against `rpc_url`, signing with `wallet`,
    /// targeting the anchor-registry contract at `contract_address`.
    pub fn new(
        provider: Provider<Http>,
        wallet: LocalWallet,
        contract_address: Address,
        chain_id: String,
        required_confirmations: u64,
    ) -> Self {
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Self {
            client,
            contract_address,
            chain_id,
            required_confirmations,
            watch_poll_interval: Duration::from_secs(3),
            watch_deadline: Duration::from_secs(600),
        }
    }

    fn contract(&self) -> CertenAnchor<SignerProvider> {
        CertenAnchor::new(self.contract_address, self.client.clone())
    }

    fn encode_submission(submission: &GovernanceProofSubmission) -> GovernanceProof {
        GovernanceProof {
            adi_url: submission.adi_url.clone(),
            anchor_id: uuid_to_bytes32(submission.anchor_id.as_uuid()),
            merkle_proof: submission
                .merkle_proof
                .iter()
                .map(|h| *h.as_bytes())
                .collect(),
            key_book_proof: *submission.key_book_proof.as_bytes(),
            role_proof: *submission.role_proof.as_bytes(),
            threshold_proof: *submission.threshold_proof.as_bytes(),
            timestamp: submission.timestamp as u64,
            expires_at: submission.expires_at as u64,
            validator_signatures: submission
                .validator_signatures
                .iter()
                .map(|s| s.to_bytes().into())
                .collect(),
            nonce: submission.nonce,
            required_level: match submission.required_level {
                GovernanceLevel::G0 => 0,
                GovernanceLevel::G1 => 1,
                GovernanceLevel::G2 => 2,
            },
        }
    }
}

#[async_trait]
impl ExternalChainStrategy for EthereumStrategy {
    fn platform(&self) -> ChainPlatform {
        ChainPlatform::Ethereum
    }

    async fn create_anchor(
        &self,
        request: &AnchorRequest,
    ) -> Result<(AnchorId, String), AnchorError> {
        let root_bytes: [u8; 32] = *request.merkle_root.as_bytes();
        let call = self
            .contract()
            .create_anchor(root_bytes, request.tx_count)
            .send()
            .await
            .map_err(|e| AnchorError::Unavailable(format!("create_anchor send failed: {e}")))?;

        let receipt = call
            .await
            .map_err(|e| AnchorError::Unavailable(format!("create_anchor confirm failed: {e}")))?
            .ok_or_else(|| AnchorError::Unavailable("create_anchor transaction dropped".into()))?;

        let tx_hash = format!("{:?}", receipt.transaction_hash);
        // The registry contract returns the anchor id as a return value in
        // its call path, but the send/await pattern above only observes the
        // mined receipt; derive a stable anchor id from the tx hash and
        // batch id so retries of the same request are idempotent.
        let anchor_id = AnchorId::from_uuid(certen_types::Uuid::new_v5(
            &certen_types::Uuid::NAMESPACE_OID,
            format!("{}:{}", request.batch_id, tx_hash).as_bytes(),
        ));

        Ok((anchor_id, tx_hash))
    }

    async fn submit_proof(
        &self,
        anchor_id: AnchorId,
        submission: &GovernanceProofSubmission,
    ) -> Result<String, AnchorError> {
        let anchor_bytes = uuid_to_bytes32(anchor_id.as_uuid());
        let proof = Self::encode_submission(submission);

        let call = self
            .contract()
            .submit_proof(anchor_bytes, proof)
            .send()
            .await
            .map_err(|e| AnchorError::Unavailable(format!("submit_proof send failed: {e}")))?;

        let receipt = call
            .await
            .map_err(|e| AnchorError::Unavailable(format!("submit_proof confirm failed: {e}")))?
            .ok_or_else(|| AnchorError::Unavailable("submit_proof transaction dropped".into()))?;

        Ok(format!("{:?}", receipt.transaction_hash))
    }

    async fn execute_with_governance(
        &self,
        _anchor_id: AnchorId,
        params: &ExecutionParams,
    ) -> Result<String, AnchorError> {
        let target: Address = params
            .target
            .parse()
            .map_err(|e| AnchorError::Invalid(format!("bad target address: {e}")))?;
        let value = U256::from(params.value);
        let data = Bytes::from(params.data.clone());
        let proof = Self::encode_submission(&params.proof);

        let call = self
            .contract()
            .execute_with_governance_proof(target, value, data, proof)
            .send()
            .await
            .map_err(|e| AnchorError::Unavailable(format!("execute send failed: {e}")))?;

        let receipt = call
            .await
            .map_err(|e| AnchorError::Unavailable(format!("execute confirm failed: {e}")))?
            .ok_or_else(|| AnchorError::Unavailable("execute transaction dropped".into()))?;

        if receipt.status != Some(U64::from(1)) {
            return Err(AnchorError::Malformed(format!(
                "execution reverted: {:?}",
                receipt.transaction_hash
            )));
        }

        Ok(format!("{:?}", receipt.transaction_hash))
    }

    async fn observe_transaction(
        &self,
        proof_id: ProofId,
        tx_hash: &str,
        previous: Option<&ChainExecutionResult>,
    ) -> Result<ChainExecutionResult, AnchorError> {
        observe_once(
            &self.client,
            &self.chain_id,
            self.required_confirmations,
            proof_id,
            tx_hash,
            previous,
        )
        .await
    }

    async fn observe_transaction_async(
        &self,
        proof_id: ProofId,
        tx_hash: String,
        previous: Option<ChainExecutionResult>,
        on_finalized: OnFinalized,
        on_failed: OnFailed,
    ) {
        let client = self.client.clone();
        let chain_id = self.chain_id.clone();
        let required_confirmations = self.required_confirmations;
        let poll_interval = self.watch_poll_interval;
        let deadline = self.watch_deadline;

        tokio::spawn(async move {
            let deadline_at = tokio::time::Instant::now() + deadline;
            loop {
                match observe_once(
                    &client,
                    &chain_id,
                    required_confirmations,
                    proof_id,
                    &tx_hash,
                    previous.as_ref(),
                )
                .await
                {
                    Ok(result) if result.is_finalized => {
                        on_finalized(result);
                        return;
                    }
                    Ok(result) if result.status == ExecutionStatus::Failed => {
                        on_failed(AnchorError::Malformed(format!(
                            "transaction {} failed on-chain",
                            result.tx_hash
                        )));
                        return;
                    }
                    Ok(_) => {
                        // Still pending; keep polling until finality or deadline.
                    }
                    Err(e) if e.taxonomy().is_retryable() => {
                        tracing::warn!(proof_id = %proof_id, tx_hash = %tx_hash, error = %e, "observe_transaction retrying");
                    }
                    Err(e) => {
                        on_failed(e);
                        return;
                    }
                }

                if tokio::time::Instant::now() >= deadline_at {
                    on_failed(AnchorError::Unavailable(format!(
                        "observation deadline elapsed for {tx_hash}"
                    )));
                    return;
                }
                tokio::time::sleep(poll_interval).await;
            }
        });
    }

    fn required_confirmations(&self) -> u64 {
        self.required_confirmations
    }

    async fn current_block(&self) -> Result<u64, AnchorError> {
        self.client
            .get_block_number()
            .await
            .map(|b| b.as_u64())
            .map_err(|e| AnchorError::Unavailable(format!("get_block_number: {e}")))
    }

    async fn health_check(&self) -> Result<(), AnchorError> {
        self.current_block().await.map(|_| ())
    }

    async fn estimate_gas(&self, params: &ExecutionParams) -> Result<u64, AnchorError> {
        let target: Address = params
            .target
            .parse()
            .map_err(|e| AnchorError::Invalid(format!("bad target address: {e}")))?;
        let value = U256::from(params.value);
        let data = Bytes::from(params.data.clone());
        let proof = Self::encode_submission(&params.proof);

        let call = self
            .contract()
            .execute_with_governance_proof(target, value, data, proof);
        let gas = call
            .estimate_gas()
            .await
            .map_err(|e| AnchorError::Unavailable(format!("estimate_gas failed: {e}")))?;
        Ok(gas.as_u64())
    }
}

/// Fetch and interpret one transaction receipt. Shared by the blocking
/// `observe_transaction` and the polling loop spawned by
/// `observe_transaction_async`, so both paths agree on what "finalized"
/// means.
async fn observe_once(
    client: &SignerProvider,
    chain_id: &str,
    required_confirmations: u64,
    proof_id: ProofId,
    tx_hash: &str,
    previous: Option<&ChainExecutionResult>,
) -> Result<ChainExecutionResult, AnchorError> {
    let hash: H256 = tx_hash
        .parse()
        .map_err(|e| AnchorError::Invalid(format!("bad tx hash: {e}")))?;

    let receipt = client
        .get_transaction_receipt(hash)
        .await
        .map_err(|e| AnchorError::Unavailable(format!("get_transaction_receipt: {e}")))?
        .ok_or_else(|| AnchorError::NotFound(format!("no receipt for {tx_hash}")))?;

    let current_block = client
        .get_block_number()
        .await
        .map(|b| b.as_u64())
        .map_err(|e| AnchorError::Unavailable(format!("get_block_number: {e}")))?;

    let block_number = receipt.block_number.map(|b| b.as_u64());
    let confirmations = block_number
        .map(|b| current_block.saturating_sub(b) + 1)
        .unwrap_or(0);
    let is_success = receipt.status == Some(U64::from(1));
    let is_finalized = is_success && confirmations >= required_confirmations;
    let status = if is_success {
        ExecutionStatus::Success
    } else {
        ExecutionStatus::Failed
    };

    let mut result = ChainExecutionResult::new(
        proof_id,
        ChainPlatform::Ethereum,
        chain_id.to_string(),
        tx_hash.to_string(),
        block_number,
        status,
        confirmations,
        required_confirmations,
        is_finalized,
        previous,
    )?;
    if is_finalized {
        result.finalized_at = Some(chrono_now_seconds());
    }
    Ok(result)
}

fn chrono_now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Left-aligns a 16-byte UUID into a 32-byte EVM word; the upper 16 bytes
/// are zero. Matches the left-align convention the chain-anchor reference
/// uses for its own `batchId` encoding.
fn uuid_to_bytes32(id: certen_types::Uuid) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(id.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_to_bytes32_left_aligns_into_a_word() {
        let id = certen_types::Uuid::from_u128(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10);
        let bytes = uuid_to_bytes32(id);
        assert_eq!(&bytes[..16], id.as_bytes());
        assert_eq!(&bytes[16..], &[0u8; 16]);
    }
}
