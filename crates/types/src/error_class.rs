//! Shared error taxonomy used by every crate boundary in the validator.
//!
//! Each crate defines its own `thiserror`-derived error enum (so call sites
//! get a specific, matchable type), but every variant maps to one of these
//! classes via a `taxonomy()` method. The lifecycle orchestrator dispatches
//! retry/terminal handling purely off `ErrorClass`, never off which crate
//! raised the error.

/// The five error classes used across the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Required input absent in the source chain. Fatal at the builder that
    /// hit it; retryable at the orchestrator.
    NotFound,
    /// An integrity check failed (receipt recomputation, hash-chain break,
    /// message-consistency violation). Always fatal.
    Malformed,
    /// Transient I/O failure. Retried with exponential backoff.
    Unavailable,
    /// Attestation weight insufficient by its deadline.
    Threshold,
    /// Caller-side violation, surfaced to the submitter without retry.
    Invalid,
}

impl ErrorClass {
    /// Whether the orchestrator may retry an error of this class.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Unavailable)
    }
}
