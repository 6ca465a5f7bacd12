mod client;
mod error;
mod memory;
mod rpc;
mod types;

pub use client::ChainClient;
pub use error::ChainClientError;
pub use memory::MemoryChainClient;
pub use rpc::RpcChainClient;
pub use types::{
    AccountRecord, AnchorSearchResult, ChainEntryRecord, CommitHeader, QueryResponse, Receipt,
    ReceiptEntry,
};
