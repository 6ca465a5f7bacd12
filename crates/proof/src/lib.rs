//! Chained anchor proof (L1-L3) and governance proof (G0-G2) construction.
//!
//! Pure, deterministic builder functions over an already-queried
//! [`certen_chain_client::ChainClient`]: no partial proof is ever
//! returned, matching the fail-closed discipline spec §4.B requires.

mod error;
mod governance;
mod intent;
mod l1l3;
mod types;

pub use error::ProofError;
pub use governance::{build_governance_proof, AuthorityMaterialization, OutcomeMaterialization};
pub use intent::{Intent, ProofClass};
pub use l1l3::build_chained_proof;
pub use types::{
    AuthorityProof, ChainedProof, GovernanceLevel, GovernanceProof, L1Proof, L2Proof, L3Proof,
    OutcomeProof, SourcePartition,
};
