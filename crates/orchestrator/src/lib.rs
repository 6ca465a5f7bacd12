//! The proof lifecycle orchestrator and its relational persistence layer
//! (spec §4.H).
//!
//! This crate is the only place status fields on a [`ProofArtifact`] are
//! mutated. Everything upstream (proof builders, the batch collector, the
//! attestation engine, anchor observers) produces artifacts and results;
//! only [`LifecycleOrchestrator`] advances them through the lifecycle and
//! pairs every transition with a [`CustodyEvent`].

mod artifact;
mod custody;
mod cycle;
mod error;
mod lifecycle;
mod pool;
mod store;

pub use artifact::{ArtifactStatus, ProofArtifact};
pub use custody::{append as append_custody_event, verify_chain as verify_custody_chain, ActorType, CustodyEvent};
pub use cycle::{CycleLevel, ProofCycleCompletion};
pub use error::OrchestratorError;
pub use lifecycle::{LifecycleOrchestrator, RetryPolicy, RetryableError};
pub use pool::{health_check, run_migrations, PoolConfig, PoolHealth};
pub use store::{OrchestratorStore, DEFAULT_SCAN_LIMIT, MAX_SCAN_LIMIT};
