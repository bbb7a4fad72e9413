//! parity dialect: wire types, the dialect check and decoders into
//! canonical types.

pub mod types;

pub use types::{
    Action, Block, ExecutedOperation, Log, MemoryDiff, StorageDiff, Trace, TraceOutput,
    TraceResults, Transaction, TransactionReceipt, Version, VersionInfo, VmOperation, VmTrace,
};

use crate::ethereum::schema::RpcCall;
use crate::ethereum::types::{
    Block as CanonicalBlock, BlockHeader, CallTrace, Transaction as CanonicalTransaction,
    TransactionReceipt as CanonicalReceipt,
};
use serde_json::Value;

/// Method that only parity-family nodes implement
pub const VERSION_INFO_METHOD: &str = "parity_versionInfo";

/// Build the `parity_versionInfo` call used to detect the dialect
pub fn version_info() -> RpcCall<VersionInfo> {
    RpcCall::new(VERSION_INFO_METHOD, vec![], |value| serde_json::from_value(value))
}

pub(crate) fn decode_block(value: Value) -> Result<CanonicalBlock, serde_json::Error> {
    serde_json::from_value::<Block>(value).map(Into::into)
}

pub(crate) fn decode_block_header(value: Value) -> Result<BlockHeader, serde_json::Error> {
    serde_json::from_value::<Block<Value>>(value).map(Into::into)
}

pub(crate) fn decode_transaction(value: Value) -> Result<CanonicalTransaction, serde_json::Error> {
    serde_json::from_value::<Transaction>(value).map(Into::into)
}

pub(crate) fn decode_receipt(value: Value) -> Result<CanonicalReceipt, serde_json::Error> {
    serde_json::from_value::<TransactionReceipt>(value).map(Into::into)
}

pub(crate) fn decode_call_trace(value: Value) -> Result<Vec<CallTrace>, serde_json::Error> {
    serde_json::from_value::<TraceResults>(value)
        .map(|results| results.trace.into_iter().map(Into::into).collect())
}
