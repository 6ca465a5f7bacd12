use certen_types::ErrorClass;

/// Errors raised while collecting or aggregating attestations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttestationError {
    /// The submitter isn't in the referenced snapshot, its key doesn't
    /// match, or its signature fails to verify.
    #[error("invalid attestation: {0}")]
    Invalid(String),

    /// A lookup (snapshot, aggregation target) found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An aggregation-level integrity check failed (message-hash
    /// inconsistency, a BLS point outside its subgroup).
    #[error("malformed aggregation: {0}")]
    Malformed(String),

    /// Collected weight never reached quorum before the deadline.
    #[error("threshold not reached: {0}")]
    Threshold(String),
}

impl AttestationError {
    /// The error class this error maps to, for orchestrator retry dispatch.
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            AttestationError::Invalid(_) => ErrorClass::Invalid,
            AttestationError::NotFound(_) => ErrorClass::NotFound,
            AttestationError::Malformed(_) => ErrorClass::Malformed,
            AttestationError::Threshold(_) => ErrorClass::Threshold,
        }
    }
}
