//! geth dialect: wire types and decoders into canonical types.

pub mod types;

pub use types::{
    Block, CallFrame, Log, NotificationHeader, StructLog, StructLogTrace, SubscriptionResult,
    Transaction, TransactionReceipt,
};

use crate::ethereum::types::{
    Block as CanonicalBlock, BlockHeader, CallTrace, Transaction as CanonicalTransaction,
    TransactionReceipt as CanonicalReceipt,
};
use serde_json::Value;

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
    serde_json::from_value::<CallFrame>(value).map(CallFrame::flatten)
}

/// Block number announced by a `newHeads` notification
pub fn decode_new_head(params: Value) -> Result<u64, serde_json::Error> {
    serde_json::from_value::<SubscriptionResult>(params).map(|r| r.result.number.to())
}
