//! Error taxonomy for the lifecycle orchestrator and its persistence layer.

use certen_types::ErrorClass;

/// Errors raised by the orchestrator: persistence failures, illegal
/// lifecycle transitions, and custody-chain integrity violations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A custody event, hash-chain link, or lifecycle invariant was violated.
    #[error("malformed: {0}")]
    Malformed(String),

    /// The database connection pool or a query timed out or errored
    /// transiently.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A caller requested an illegal status transition.
    #[error("invalid transition: {0}")]
    Invalid(String),
}

impl OrchestratorError {
    /// Map this error onto the shared five-class taxonomy (spec §7).
    pub fn taxonomy(&self) -> ErrorClass {
        match self {
            OrchestratorError::NotFound(_) => ErrorClass::NotFound,
            OrchestratorError::Malformed(_) => ErrorClass::Malformed,
            OrchestratorError::Unavailable(_) => ErrorClass::Unavailable,
            OrchestratorError::Invalid(_) => ErrorClass::Invalid,
        }
    }
}

impl From<sqlx::Error> for OrchestratorError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => OrchestratorError::NotFound(err.to_string()),
            other => OrchestratorError::Unavailable(other.to_string()),
        }
    }
}
