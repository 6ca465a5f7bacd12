use certen_types::ErrorClass;

/// Errors raised by the batch collector.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchError {
    /// A caller-side violation (e.g. closing an already-closed batch).
    #[error("invalid batch operation: {0}")]
    Invalid(String),

    /// An integrity check failed (leaf path fails to recompute to the
    /// stored root).
    #[error("malformed batch: {0}")]
    Malformed(String),
}

impl BatchError {
    /// The error class this error maps to, for orchestrator retry dispatch.
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            BatchError::Invalid(_) => ErrorClass::Invalid,
            BatchError::Malformed(_) => ErrorClass::Malformed,
        }
    }
}
