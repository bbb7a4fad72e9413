//! Dialect-agnostic Ethereum node client.

use super::subscription::{self, BlockSubscription};
use crate::ethereum::parity;
use crate::ethereum::schema::{RpcCall, Schema};
use crate::ethereum::types::{
    Block, BlockHeader, CallTrace, Transaction, TransactionReceipt, VmState,
};
use crate::ethereum::BlockNumber;
use crate::rpc::types::{Message, Request};
use crate::rpc::{self, Transport};
use crate::utils::config::ClientConfig;
use crate::utils::error::{CallContext, ClientError, TransportError};
use alloy_primitives::{Bytes, B256, U256};
use log::{debug, info};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Client for geth- and parity-family nodes
///
/// The dialect is detected once when the client is created. Clones share
/// the connection and the shutdown token.
#[derive(Clone)]
pub struct NodeClient {
    transport: Arc<dyn Transport>,
    schema: Schema,
    config: ClientConfig,
    token: CancellationToken,
}

impl fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClient")
            .field("dialect", &self.schema.dialect())
            .field("config", &self.config)
            .field("closed", &self.token.is_cancelled())
            .finish()
    }
}

impl NodeClient {
    /// Connect to a node with the default configuration
    ///
    /// **Public** - main entry point of the library
    ///
    /// # Arguments
    /// * `target` - `http(s)://` URL, `ws(s)://` URL, `ipc://` URL or socket path
    ///
    /// # Errors
    /// * `ClientError::Dial` - the endpoint is unsupported or unreachable
    pub fn dial(target: &str) -> Result<Self, ClientError> {
        Self::dial_with_config(target, ClientConfig::default())
    }

    /// Connect to a node with custom timeouts and poll cadence
    pub fn dial_with_config(target: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let transport = rpc::dial(target, config.request_timeout).map_err(ClientError::Dial)?;
        Ok(Self::with_transport(transport, config))
    }

    /// Wrap an existing transport, asking the node for its dialect
    ///
    /// A node answering `parity_versionInfo` speaks the parity dialect.
    /// Any failure of the `parity_versionInfo` call selects geth.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let schema = detect_schema(transport.as_ref());
        Self::with_schema(transport, schema, config)
    }

    /// Wrap an existing transport with a known dialect
    pub fn with_schema(transport: Arc<dyn Transport>, schema: Schema, config: ClientConfig) -> Self {
        Self {
            transport,
            schema,
            config,
            token: CancellationToken::new(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Send a call and decode its result
    pub(crate) fn execute<T>(&self, call: RpcCall<T>, context: CallContext) -> Result<T, ClientError> {
        debug!("{} -> {}", context, call.method());

        let value = match self.transport.call_request(call.request()) {
            Ok(Value::Null) => return Err(ClientError::NotFound { context }),
            Ok(value) => value,
            Err(source) => return Err(ClientError::Call { context, source }),
        };

        call.decode(value)
            .map_err(|source| ClientError::Decode { context, source })
    }

    /// Height of the most recent block
    pub fn current_block_number(&self) -> Result<u64, ClientError> {
        self.execute(
            self.schema.eth().block_number(),
            CallContext::new("current block number"),
        )
    }

    /// Block with full transactions
    ///
    /// # Arguments
    /// * `number` - Height, `-1` for latest or `-2` for pending
    ///
    /// # Errors
    /// * `ClientError::InvalidBlockNumber` - any other negative value
    pub fn get_block(&self, number: i64) -> Result<Block, ClientError> {
        self.get_block_by_selector(BlockNumber::try_from(number)?)
    }

    pub fn get_block_by_selector(&self, number: BlockNumber) -> Result<Block, ClientError> {
        self.execute(
            self.schema.eth().get_block_by_number(number),
            CallContext::with_argument("get block", number),
        )
    }

    /// Header of the block with the given hash
    pub fn get_block_by_hash(&self, hash: &str) -> Result<BlockHeader, ClientError> {
        self.execute(
            self.schema.eth().get_block_by_hash(hash),
            CallContext::with_argument("get block by hash", hash),
        )
    }

    pub fn get_transaction(&self, hash: &str) -> Result<Transaction, ClientError> {
        self.execute(
            self.schema.eth().get_transaction(hash),
            CallContext::with_argument("get transaction", hash),
        )
    }

    pub fn get_transaction_receipt(&self, hash: &str) -> Result<TransactionReceipt, ClientError> {
        self.execute(
            self.schema.eth().get_transaction_receipt(hash),
            CallContext::with_argument("get transaction receipt", hash),
        )
    }

    pub fn get_balance(&self, address: &str, block: BlockNumber) -> Result<U256, ClientError> {
        self.execute(
            self.schema.eth().get_balance(address, block),
            CallContext::with_argument("get balance", address),
        )
    }

    pub fn get_code(&self, address: &str, block: BlockNumber) -> Result<Bytes, ClientError> {
        self.execute(
            self.schema.eth().get_code(address, block),
            CallContext::with_argument("get code", address),
        )
    }

    pub fn get_storage_at(
        &self,
        address: &str,
        key: B256,
        block: BlockNumber,
    ) -> Result<B256, ClientError> {
        self.execute(
            self.schema.eth().get_storage_at(address, key, block),
            CallContext::with_argument("get storage", format!("{} {}", address, key)),
        )
    }

    /// Network id reported by `net_version`
    pub fn get_network_id(&self) -> Result<String, ClientError> {
        self.execute(self.schema.net().version(), CallContext::new("get network id"))
    }

    pub fn get_peer_count(&self) -> Result<u64, ClientError> {
        self.execute(self.schema.net().peer_count(), CallContext::new("get peer count"))
    }

    pub fn get_client_version(&self) -> Result<String, ClientError> {
        self.execute(
            self.schema.net().client_version(),
            CallContext::new("get client version"),
        )
    }

    /// Execution-ordered VM states of a transaction
    ///
    /// parity traces are flattened by the trace walker, geth struct logs
    /// are converted in place.
    ///
    /// # Errors
    /// * `ClientError::Trace` - the trace points outside its bytecode
    pub fn get_transaction_vm_trace(&self, tx: &Transaction) -> Result<Vec<VmState>, ClientError> {
        let hash = tx.hash.to_string();
        let context = CallContext::with_argument("get transaction vm trace", &hash);

        let raw = self.execute(self.schema.trace().vm_trace(&hash), context.clone())?;
        let states = raw
            .into_states()
            .map_err(|source| ClientError::Trace { context, source })?;

        debug!("Trace of {} has {} states", hash, states.len());
        Ok(states)
    }

    /// Call frames of a transaction in pre-order
    pub fn get_transaction_call_trace(&self, hash: &str) -> Result<Vec<CallTrace>, ClientError> {
        self.execute(
            self.schema.trace().call_trace(hash),
            CallContext::with_argument("get transaction call trace", hash),
        )
    }

    /// Forward a raw envelope to the node
    ///
    /// Only `result` and `error` of `message` are rewritten. An `error`
    /// returned by the node is stored in the message, not raised.
    pub fn call(&self, message: &mut Message) -> Result<(), ClientError> {
        let params = match &message.params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(params)) => params.clone(),
            Some(param) => vec![param.clone()],
        };
        let request = Request::new(message.method.as_str(), params);

        let response = self
            .transport
            .send_raw_request(&request)
            .map_err(|source| ClientError::Call {
                context: CallContext::with_argument("call", &message.method),
                source,
            })?;

        message.result = response.result;
        message.error = response.error;
        Ok(())
    }

    /// Stream of new block heights
    ///
    /// Push notifications are used when the node supports them, polling
    /// otherwise or when `force_poll` is set.
    pub fn subscribe(&self, force_poll: bool) -> Result<BlockSubscription, ClientError> {
        subscription::start(self, force_poll)
    }

    /// Stop every subscription and release the connection
    pub fn close(&self) -> Result<(), ClientError> {
        self.token.cancel();
        self.transport.close().map_err(|source| ClientError::Call {
            context: CallContext::new("close"),
            source,
        })
    }
}

fn detect_schema(transport: &dyn Transport) -> Schema {
    let version_call = parity::version_info();

    let detected = transport
        .call_request(version_call.request())
        .and_then(|value| version_call.decode(value).map_err(TransportError::from));

    match detected {
        Ok(version) => {
            info!("Connected to parity node {}", version);
            Schema::PARITY
        }
        Err(err) => {
            if err.is_method_not_found() {
                debug!("Node does not serve {}, using geth dialect", version_call.method());
            } else {
                debug!("{} failed ({}), using geth dialect", version_call.method(), err);
            }
            info!("Connected to geth node");
            Schema::GETH
        }
    }
}
