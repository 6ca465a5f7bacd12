use certen_chain_client::ChainClientError;
use certen_types::ErrorClass;

/// Errors raised while constructing a chained or governance proof.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProofError {
    /// A required layer could not be located (missing receipt, no matching
    /// anchor-pool entry). Callers may retry later.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response or derived value failed its shape or fold check.
    #[error("malformed: {0}")]
    Malformed(String),

    /// An invariant that should always hold for well-formed proofs failed
    /// (pairing mismatch, receipt start/anchor mismatch, MBI ordering).
    #[error("invariant violated: {0}")]
    Invalid(String),

    /// A governance threshold was not met.
    #[error("threshold not met: {0}")]
    Threshold(String),

    /// The upstream chain client could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ProofError {
    /// The error class this error maps to, for orchestrator retry dispatch.
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            ProofError::NotFound(_) => ErrorClass::NotFound,
            ProofError::Malformed(_) => ErrorClass::Malformed,
            ProofError::Invalid(_) => ErrorClass::Invalid,
            ProofError::Threshold(_) => ErrorClass::Threshold,
            ProofError::Unavailable(_) => ErrorClass::Unavailable,
        }
    }
}

impl From<ChainClientError> for ProofError {
    fn from(err: ChainClientError) -> Self {
        match err {
            ChainClientError::NotFound(msg) => ProofError::NotFound(msg),
            ChainClientError::Malformed(msg) => ProofError::Malformed(msg),
            ChainClientError::Unavailable(msg) => ProofError::Unavailable(msg),
        }
    }
}
