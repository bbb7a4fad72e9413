//! Canonical domain types shared by every node dialect.
//!
//! Wire types of each dialect convert into these, so callers never see
//! which node family answered.

use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A block with its full transaction list, in on-chain order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(flatten)]
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Block header fields
///
/// `number`, `hash` and `coinbase` are only absent for a pending block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub number: Option<u64>,
    pub hash: Option<B256>,
    pub parent_hash: B256,
    pub timestamp: U256,
    pub difficulty: U256,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub gas_price: Option<U256>,
    pub base_fee_per_gas: Option<U256>,
    pub coinbase: Option<Address>,
}

impl BlockHeader {
    /// Block timestamp as UTC, if it fits in the supported range
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp(seconds, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub hash: B256,
    pub nonce: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_index: Option<u64>,
    /// Address of the created contract, reported by parity only
    pub creates: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub block_hash: B256,
    pub block_number: u64,
    pub gas_used: U256,
    pub cumulative_gas_used: U256,
    pub contract_address: Option<Address>,
    /// `None` before Byzantium, where `root` is reported instead
    pub status: Option<u64>,
    pub logs: Vec<Log>,
    pub logs_bloom: Bloom,
    pub root: Option<B256>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|status| status == 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    /// Set when the log was dropped by a chain reorganisation
    pub removed: bool,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
}

/// Memory written by one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryChunk {
    pub offset: u64,
    pub data: Bytes,
}

/// Storage slot written by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageChange {
    pub key: U256,
    pub value: U256,
}

/// One executed VM instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmState {
    pub pc: u64,
    pub op: String,
    /// Gas remaining after the step
    pub gas: u64,
    pub gas_cost: u64,
    /// Call depth, 1 for the transaction's own frame
    pub depth: usize,
    pub stack: Option<Vec<U256>>,
    /// Words pushed onto the stack by the step
    pub pushed: Vec<U256>,
    pub memory: Option<MemoryChunk>,
    pub storage: Option<StorageChange>,
    pub error: Option<String>,
    /// Number of states of the nested frame inlined right after this one
    pub inlined_steps: usize,
    /// Last state of its frame
    pub terminal: bool,
}

/// One call frame of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTrace {
    pub call_type: String,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub output: Bytes,
    pub gas: u64,
    pub gas_used: u64,
    pub value: U256,
    /// Path of child indexes from the root frame
    pub trace_address: Vec<usize>,
    pub subtraces: usize,
    pub error: Option<String>,
}

impl CallTrace {
    pub fn depth(&self) -> usize {
        self.trace_address.len()
    }

    pub fn reverted(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_utc() {
        let header = BlockHeader {
            number: Some(1),
            hash: Some(B256::ZERO),
            parent_hash: B256::ZERO,
            timestamp: U256::from(1_438_269_988u64),
            difficulty: U256::ZERO,
            gas_limit: U256::ZERO,
            gas_used: U256::ZERO,
            gas_price: None,
            base_fee_per_gas: None,
            coinbase: None,
        };

        assert_eq!(
            header.timestamp_utc().unwrap().to_rfc3339(),
            "2015-07-30T15:26:28+00:00"
        );
    }
}
