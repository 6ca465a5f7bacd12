//! External-chain anchoring strategies and the execution-result hash chain
//! (spec §4.G).

mod error;
mod ethereum;
mod stub;
mod strategy;
mod types;

pub use error::AnchorError;
pub use ethereum::EthereumStrategy;
pub use stub::StubStrategy;
pub use strategy::{ExternalChainStrategy, OnFailed, OnFinalized};
pub use types::{
    AnchorRecord, AnchorRecordStatus, AnchorReference, AnchorRequest, ChainExecutionResult,
    ChainPlatform, ExecutionParams, ExecutionStatus, GovernanceProofSubmission,
};
