//! Attestation quorum engine: per-validator signing, collection,
//! aggregation, and stake-weighted threshold decisions (spec §4.F).

mod collector;
mod error;
mod message;
mod snapshot;
mod types;

pub use collector::AttestationCollector;
pub use error::AttestationError;
pub use message::{
    batch_attestation_message, batch_identity_hash, governance_attestation_message,
    DOMAIN_BATCH_ATTESTATION, DOMAIN_GOVERNANCE_ATTESTATION,
};
pub use snapshot::{ValidatorEntry, ValidatorSetSnapshot};
pub use types::{AggregatedAttestation, Attestation, Scheme};
