//! Ethereum domain model and the dialect-negotiating schema.
//!
//! This module handles:
//! - Canonical block, transaction, receipt and trace types
//! - Wire shapes of the geth and parity dialects
//! - Building requests for whichever dialect the node speaks

pub mod geth;
pub mod number;
pub mod parity;
pub mod schema;
pub mod types;

pub use number::{BlockNumber, LATEST_BLOCK_NUMBER, PENDING_BLOCK_NUMBER};
pub use schema::{Dialect, RpcCall, Schema};
pub use types::{
    Block, BlockHeader, CallTrace, Log, MemoryChunk, StorageChange, Transaction,
    TransactionReceipt, VmState,
};
