use certen_types::ErrorClass;

/// Errors raised while submitting to, or observing, an external chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnchorError {
    /// The requested anchor, transaction, or execution result doesn't exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An integrity check failed: a hash-chain break, a call-data encoding
    /// mismatch, or a receipt that doesn't match what was submitted.
    #[error("malformed: {0}")]
    Malformed(String),

    /// A transient RPC failure, or a platform that has no live
    /// implementation wired up (the Solana/Cosmos stubs).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A caller-side violation: wrong governance level for the entry point
    /// requested, a proof submission missing required fields.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl AnchorError {
    /// The error class this error maps to, for orchestrator retry dispatch.
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            AnchorError::NotFound(_) => ErrorClass::NotFound,
            AnchorError::Malformed(_) => ErrorClass::Malformed,
            AnchorError::Unavailable(_) => ErrorClass::Unavailable,
            AnchorError::Invalid(_) => ErrorClass::Invalid,
        }
    }
}
