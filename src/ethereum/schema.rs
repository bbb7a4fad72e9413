//! Request builders for both node dialects.
//!
//! A [`Schema`] is picked once per connection. Every builder returns an
//! [`RpcCall`]: the request to send paired with the decoder that turns the
//! dialect's result into a canonical value. Callers never branch on the
//! dialect themselves.

use super::number::BlockNumber;
use super::types::{Block, BlockHeader, CallTrace, Transaction, TransactionReceipt};
use super::{geth, parity};
use crate::rpc::types::{Request, SubscriptionId};
use crate::trace::RawVmTrace;
use alloy_primitives::{Bytes, B256, U256, U64};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

/// Turns a raw `result` into a typed value
pub type Decoder<T> = fn(Value) -> Result<T, serde_json::Error>;

/// A request together with the decoder for its response
pub struct RpcCall<T> {
    request: Request,
    decoder: Decoder<T>,
}

impl<T> RpcCall<T> {
    pub fn new(method: &str, params: Vec<Value>, decoder: Decoder<T>) -> Self {
        Self {
            request: Request::new(method, params),
            decoder,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    /// Populate the typed value from a raw result
    pub fn decode(&self, value: Value) -> Result<T, serde_json::Error> {
        (self.decoder)(value)
    }
}

impl<T> fmt::Debug for RpcCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCall")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// Node implementation family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Geth,
    Parity,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Geth => f.write_str("geth"),
            Dialect::Parity => f.write_str("parity"),
        }
    }
}

fn pick<T>(dialect: Dialect, geth: Decoder<T>, parity: Decoder<T>) -> Decoder<T> {
    match dialect {
        Dialect::Geth => geth,
        Dialect::Parity => parity,
    }
}

fn decode_quantity(value: Value) -> Result<u64, serde_json::Error> {
    serde_json::from_value::<U64>(value).map(|n| n.to())
}

/// Capability set of one dialect, grouped by RPC domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    dialect: Dialect,
}

impl Schema {
    pub const GETH: Schema = Schema::new(Dialect::Geth);
    pub const PARITY: Schema = Schema::new(Dialect::Parity);

    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Chain state queries
    pub fn eth(&self) -> EthSchema {
        EthSchema {
            dialect: self.dialect,
        }
    }

    /// Network information queries
    pub fn net(&self) -> NetSchema {
        NetSchema
    }

    /// Transaction tracing
    pub fn trace(&self) -> TraceSchema {
        TraceSchema {
            dialect: self.dialect,
        }
    }

    /// Publish/subscribe
    pub fn pubsub(&self) -> PubSubSchema {
        PubSubSchema
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EthSchema {
    dialect: Dialect,
}

impl EthSchema {
    pub fn block_number(&self) -> RpcCall<u64> {
        RpcCall::new("eth_blockNumber", vec![], decode_quantity)
    }

    pub fn get_block_by_number(&self, number: BlockNumber) -> RpcCall<Block> {
        RpcCall::new(
            "eth_getBlockByNumber",
            vec![json!(number.to_param()), json!(true)],
            pick(self.dialect, geth::decode_block, parity::decode_block),
        )
    }

    pub fn get_block_by_hash(&self, hash: &str) -> RpcCall<BlockHeader> {
        RpcCall::new(
            "eth_getBlockByHash",
            vec![json!(hash), json!(false)],
            pick(self.dialect, geth::decode_block_header, parity::decode_block_header),
        )
    }

    pub fn get_transaction(&self, hash: &str) -> RpcCall<Transaction> {
        RpcCall::new(
            "eth_getTransactionByHash",
            vec![json!(hash)],
            pick(self.dialect, geth::decode_transaction, parity::decode_transaction),
        )
    }

    pub fn get_transaction_receipt(&self, hash: &str) -> RpcCall<TransactionReceipt> {
        RpcCall::new(
            "eth_getTransactionReceipt",
            vec![json!(hash)],
            pick(self.dialect, geth::decode_receipt, parity::decode_receipt),
        )
    }

    pub fn get_balance(&self, address: &str, block: BlockNumber) -> RpcCall<U256> {
        RpcCall::new(
            "eth_getBalance",
            vec![json!(address), json!(block.to_param())],
            serde_json::from_value::<U256>,
        )
    }

    pub fn get_code(&self, address: &str, block: BlockNumber) -> RpcCall<Bytes> {
        RpcCall::new(
            "eth_getCode",
            vec![json!(address), json!(block.to_param())],
            serde_json::from_value::<Bytes>,
        )
    }

    pub fn get_storage_at(&self, address: &str, key: B256, block: BlockNumber) -> RpcCall<B256> {
        RpcCall::new(
            "eth_getStorageAt",
            vec![json!(address), json!(key), json!(block.to_param())],
            serde_json::from_value::<B256>,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetSchema;

impl NetSchema {
    pub fn version(&self) -> RpcCall<String> {
        RpcCall::new("net_version", vec![], serde_json::from_value::<String>)
    }

    pub fn peer_count(&self) -> RpcCall<u64> {
        RpcCall::new("net_peerCount", vec![], decode_quantity)
    }

    pub fn client_version(&self) -> RpcCall<String> {
        RpcCall::new("web3_clientVersion", vec![], serde_json::from_value::<String>)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TraceSchema {
    dialect: Dialect,
}

impl TraceSchema {
    /// Per-instruction trace of a transaction
    pub fn vm_trace(&self, hash: &str) -> RpcCall<RawVmTrace> {
        match self.dialect {
            Dialect::Geth => RpcCall::new(
                "debug_traceTransaction",
                vec![json!(hash), json!({"disableStorage": false, "enableMemory": true})],
                |value| serde_json::from_value::<geth::StructLogTrace>(value).map(RawVmTrace::Flat),
            ),
            Dialect::Parity => RpcCall::new(
                "trace_replayTransaction",
                vec![json!(hash), json!(["vmTrace"])],
                |value| {
                    serde_json::from_value::<parity::TraceResults>(value)
                        .map(|results| RawVmTrace::Nested(results.vm_trace.unwrap_or_default()))
                },
            ),
        }
    }

    /// Call frames of a transaction
    pub fn call_trace(&self, hash: &str) -> RpcCall<Vec<CallTrace>> {
        match self.dialect {
            Dialect::Geth => RpcCall::new(
                "debug_traceTransaction",
                vec![json!(hash), json!({"tracer": "callTracer"})],
                geth::decode_call_trace,
            ),
            Dialect::Parity => RpcCall::new(
                "trace_replayTransaction",
                vec![json!(hash), json!(["trace"])],
                parity::decode_call_trace,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PubSubSchema;

impl PubSubSchema {
    /// Subscribe to new block headers
    pub fn subscribe(&self) -> RpcCall<SubscriptionId> {
        RpcCall::new(
            "eth_subscribe",
            vec![json!("newHeads")],
            serde_json::from_value::<SubscriptionId>,
        )
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) -> RpcCall<bool> {
        RpcCall::new(
            "eth_unsubscribe",
            vec![json!(id.as_str())],
            serde_json::from_value::<bool>,
        )
    }
}
