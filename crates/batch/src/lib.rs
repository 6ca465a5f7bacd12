//! Batch commitment engine: collects proof artifacts into cadence batches or
//! on-demand singletons, and commits each as a Merkle tree (spec §4.E).

mod collector;
mod error;
mod types;

pub use collector::{BatchCollector, ClosedBatch, PendingLeaf};
pub use error::BatchError;
pub use types::{Batch, BatchStatus, BatchTransaction, BatchType};
