//! Wire shapes returned by parity-family nodes.

use crate::ethereum::types::{
    Block as CanonicalBlock, BlockHeader, CallTrace, Log as CanonicalLog,
    Transaction as CanonicalTransaction, TransactionReceipt as CanonicalReceipt,
};
use alloy_primitives::{Address, Bloom, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of `parity_versionInfo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub hash: Option<String>,
    pub track: String,
    pub version: Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "v{}.{}.{}-{}",
            self.version.major, self.version.minor, self.version.patch, self.track
        )
    }
}

/// Block as returned by `eth_getBlockBy*`
///
/// Parity reports the beneficiary both as `author` and `miner`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<TX = Transaction> {
    pub number: Option<U64>,
    pub hash: Option<B256>,
    pub parent_hash: B256,
    pub timestamp: U256,
    #[serde(default)]
    pub difficulty: U256,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub gas_price: Option<U256>,
    pub base_fee_per_gas: Option<U256>,
    pub author: Option<Address>,
    pub miner: Option<Address>,
    #[serde(default = "Vec::new")]
    pub transactions: Vec<TX>,
}

impl<TX> Block<TX> {
    fn header(&self) -> BlockHeader {
        BlockHeader {
            number: self.number.map(|n| n.to()),
            hash: self.hash,
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            gas_price: self.gas_price,
            base_fee_per_gas: self.base_fee_per_gas,
            coinbase: self.author.or(self.miner),
        }
    }
}

impl From<Block<Transaction>> for CanonicalBlock {
    fn from(block: Block<Transaction>) -> Self {
        CanonicalBlock {
            header: block.header(),
            transactions: block.transactions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Block<Value>> for BlockHeader {
    fn from(block: Block<Value>) -> Self {
        block.header()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: B256,
    pub nonce: U64,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
    pub gas: U256,
    pub gas_price: Option<U256>,
    pub block_number: Option<U64>,
    pub block_hash: Option<B256>,
    pub transaction_index: Option<U64>,
    pub creates: Option<Address>,
}

impl From<Transaction> for CanonicalTransaction {
    fn from(tx: Transaction) -> Self {
        CanonicalTransaction {
            hash: tx.hash,
            nonce: tx.nonce.to(),
            from: tx.from,
            to: tx.to,
            input: tx.input,
            value: tx.value,
            gas: tx.gas,
            gas_price: tx.gas_price,
            block_number: tx.block_number.map(|n| n.to()),
            block_hash: tx.block_hash,
            transaction_index: tx.transaction_index.map(|n| n.to()),
            creates: tx.creates,
        }
    }
}

/// Parity marks logs dropped by a reorg with `"type": "removed"`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub removed: bool,
    #[serde(rename = "type")]
    pub log_type: Option<String>,
    pub block_number: Option<U64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<U64>,
    pub transaction_log_index: Option<U64>,
}

impl From<Log> for CanonicalLog {
    fn from(log: Log) -> Self {
        let removed = log.removed || log.log_type.as_deref() == Some("removed");
        CanonicalLog {
            address: log.address,
            topics: log.topics,
            data: log.data,
            removed,
            block_number: log.block_number.map(|n| n.to()),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|n| n.to()),
        }
    }
}

/// Pre-Byzantium parity receipts carry `root` and a `null` status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub transaction_index: U64,
    pub block_hash: B256,
    pub block_number: U64,
    pub gas_used: U256,
    pub cumulative_gas_used: U256,
    pub contract_address: Option<Address>,
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<Log>,
    pub logs_bloom: Bloom,
    pub root: Option<B256>,
}

impl From<TransactionReceipt> for CanonicalReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        CanonicalReceipt {
            transaction_hash: receipt.transaction_hash,
            transaction_index: receipt.transaction_index.to(),
            block_hash: receipt.block_hash,
            block_number: receipt.block_number.to(),
            gas_used: receipt.gas_used,
            cumulative_gas_used: receipt.cumulative_gas_used,
            contract_address: receipt.contract_address,
            status: receipt.status.map(|s| s.to()),
            logs: receipt.logs.into_iter().map(Into::into).collect(),
            logs_bloom: receipt.logs_bloom,
            root: receipt.root,
        }
    }
}

/// Result of `trace_replayTransaction`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResults {
    #[serde(default)]
    pub output: Bytes,
    pub vm_trace: Option<VmTrace>,
    #[serde(default)]
    pub trace: Vec<Trace>,
}

/// Nested VM trace of one call frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VmTrace {
    /// Bytecode executing in this frame
    pub code: Bytes,
    pub ops: Vec<VmOperation>,
}

/// One instruction of a [`VmTrace`]
///
/// Parity does not report mnemonics and usually omits the stack.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VmOperation {
    pub pc: u64,
    pub cost: u64,
    pub ex: Option<ExecutedOperation>,
    /// Trace of the frame entered by a CALL/CREATE
    pub sub: Option<VmTrace>,
    pub stack: Option<Vec<U256>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecutedOperation {
    /// Gas remaining after the instruction
    pub used: u64,
    #[serde(default)]
    pub push: Vec<U256>,
    pub mem: Option<MemoryDiff>,
    pub store: Option<StorageDiff>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryDiff {
    pub off: u64,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StorageDiff {
    pub key: U256,
    pub val: U256,
}

/// One call frame of the flat `trace` list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub action: Action,
    pub result: Option<TraceOutput>,
    #[serde(default)]
    pub subtraces: usize,
    #[serde(default)]
    pub trace_address: Vec<usize>,
    #[serde(rename = "type")]
    pub trace_type: String,
    pub error: Option<String>,
}

/// Union of the call, create and suicide action shapes
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub call_type: Option<String>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub init: Bytes,
    pub gas: Option<U64>,
    pub value: Option<U256>,
    pub address: Option<Address>,
    pub refund_address: Option<Address>,
    pub balance: Option<U256>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceOutput {
    pub gas_used: Option<U64>,
    #[serde(default)]
    pub output: Bytes,
    pub address: Option<Address>,
    #[serde(default)]
    pub code: Bytes,
}

impl From<Trace> for CallTrace {
    fn from(trace: Trace) -> Self {
        let action = trace.action;
        let result = trace.result.unwrap_or_default();

        CallTrace {
            call_type: action.call_type.unwrap_or(trace.trace_type),
            from: action.from.or(action.address).unwrap_or_default(),
            to: action.to.or(result.address).or(action.refund_address),
            input: if action.init.is_empty() { action.input } else { action.init },
            output: if result.code.is_empty() { result.output } else { result.code },
            gas: action.gas.map_or(0, |g| g.to()),
            gas_used: result.gas_used.map_or(0, |g| g.to()),
            value: action.value.or(action.balance).unwrap_or_default(),
            trace_address: trace.trace_address,
            subtraces: trace.subtraces,
            error: trace.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removed_log_type() {
        let log: Log = serde_json::from_value(json!({
            "address": "0x00000000000000000000000000000000000000aa",
            "topics": [],
            "data": "0x",
            "type": "removed"
        }))
        .unwrap();

        assert!(CanonicalLog::from(log).removed);
    }

    #[test]
    fn test_create_trace_conversion() {
        let trace: Trace = serde_json::from_value(json!({
            "action": {
                "from": "0x00000000000000000000000000000000000000aa",
                "gas": "0x5208",
                "init": "0x6000",
                "value": "0x0"
            },
            "result": {
                "address": "0x00000000000000000000000000000000000000cc",
                "code": "0x00",
                "gasUsed": "0x100"
            },
            "subtraces": 0,
            "traceAddress": [1],
            "type": "create"
        }))
        .unwrap();

        let call = CallTrace::from(trace);
        assert_eq!(call.call_type, "create");
        assert_eq!(call.input, Bytes::from(vec![0x60, 0x00]));
        assert_eq!(call.output, Bytes::from(vec![0x00]));
        assert_eq!(call.gas, 0x5208);
        assert_eq!(call.gas_used, 0x100);
        assert_eq!(call.trace_address, vec![1]);
        assert!(call.to.is_some());
    }

    #[test]
    fn test_version_display() {
        let info: VersionInfo = serde_json::from_value(json!({
            "hash": "0x2ae8b4c",
            "track": "stable",
            "version": {"major": 2, "minor": 7, "patch": 2}
        }))
        .unwrap();

        assert_eq!(info.to_string(), "v2.7.2-stable");
    }
}
