//! Core hashing, cryptographic, and identifier types shared by every
//! component of the proof validator.

mod crypto;
mod error_class;
mod hash;
mod identifiers;
mod keccak;
mod merkle;
mod signer_bitfield;

pub use crypto::{AggregateError, KeyPair, KeyType, PublicKey, Signature};
pub use error_class::ErrorClass;
pub use hash::{Hash, HexError};
pub use identifiers::{AnchorId, BatchId, CycleId, IntentId, ProofId, ValidatorId, VotePower};
pub use keccak::KeccakHash;
pub use merkle::{batch_leaf_hash, build_merkle_tree_with_paths, MerklePath, Position};

// Re-export so downstream crates that build on these primitives don't need
// to pin their own versions.
pub use uuid::Uuid;
