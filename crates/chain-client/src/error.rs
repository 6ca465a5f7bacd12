use certen_types::ErrorClass;

/// Errors returned by a [`crate::ChainClient`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainClientError {
    /// The requested record does not exist on the source chain.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response was malformed (wrong hash length, invalid hex, receipt
    /// that fails to recompute).
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A transient I/O failure (network error, timeout, 5xx).
    #[error("chain client unavailable: {0}")]
    Unavailable(String),
}

impl ChainClientError {
    /// The error class this error maps to, for orchestrator retry dispatch.
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            ChainClientError::NotFound(_) => ErrorClass::NotFound,
            ChainClientError::Malformed(_) => ErrorClass::Malformed,
            ChainClientError::Unavailable(_) => ErrorClass::Unavailable,
        }
    }
}
