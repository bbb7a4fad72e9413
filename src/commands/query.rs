//! Query command implementation.
//!
//! Every query:
//! 1. Validates its arguments
//! 2. Connects to the node and detects the dialect
//! 3. Runs one client operation
//! 4. Prints the result as pretty JSON

use crate::client::NodeClient;
use crate::ethereum::BlockNumber;
use crate::rpc::{Endpoint, Message};
use crate::utils::config::ClientConfig;
use alloy_primitives::{B256, U256};
use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::{json, Value};
use std::time::Instant;

/// One read-only request against the node
///
/// **Public** - constructed by main.rs from CLI args
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Dialect,
    BlockNumber,
    Block { number: BlockNumber },
    BlockByHash { hash: String },
    Transaction { hash: String },
    Receipt { hash: String },
    Balance { address: String, block: BlockNumber },
    Code { address: String, block: BlockNumber },
    Storage { address: String, key: U256, block: BlockNumber },
    VmTrace { hash: String },
    CallTrace { hash: String },
    Network,
    Call { method: String, params: Option<Value> },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::Dialect => "dialect",
            Query::BlockNumber => "block-number",
            Query::Block { .. } => "block",
            Query::BlockByHash { .. } => "block-by-hash",
            Query::Transaction { .. } => "tx",
            Query::Receipt { .. } => "receipt",
            Query::Balance { .. } => "balance",
            Query::Code { .. } => "code",
            Query::Storage { .. } => "storage",
            Query::VmTrace { .. } => "vm-trace",
            Query::CallTrace { .. } => "call-trace",
            Query::Network => "network",
            Query::Call { .. } => "call",
        }
    }
}

/// Execute a query and print its result
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `rpc_url` - Node endpoint (HTTP or WebSocket URL, or IPC path)
/// * `config` - Client timeouts
/// * `query` - What to ask the node
///
/// # Errors
/// * Invalid arguments
/// * Connection failures
/// * RPC or decode errors of the query itself
pub fn execute_query(rpc_url: &str, config: ClientConfig, query: &Query) -> Result<()> {
    let start_time = Instant::now();

    validate_query(query)?;
    let client = connect(rpc_url, config)?;

    info!("Running {} against {}", query.name(), rpc_url);
    let output = run_query(&client, query)
        .with_context(|| format!("Failed to run {} query", query.name()))?;

    println!("{}", serde_json::to_string_pretty(&output)?);

    client.close().context("Failed to close connection")?;
    debug!("Query completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Connect to a node after validating the endpoint
///
/// **Public** - shared by every command
pub fn connect(rpc_url: &str, config: ClientConfig) -> Result<NodeClient> {
    validate_rpc_target(rpc_url)?;

    let client = NodeClient::dial_with_config(rpc_url, config)
        .with_context(|| format!("Failed to connect to {}", rpc_url))?;

    info!("Node speaks the {} dialect", client.schema().dialect());
    Ok(client)
}

/// Run a query on a connected client and return its JSON rendering
///
/// **Public** - separated from printing so it can run against any transport
pub fn run_query(client: &NodeClient, query: &Query) -> Result<Value> {
    let output = match query {
        Query::Dialect => json!({ "dialect": client.schema().dialect() }),
        Query::BlockNumber => json!(client.current_block_number()?),
        Query::Block { number } => {
            let block = client.get_block_by_selector(*number)?;
            let mut value = serde_json::to_value(&block)?;
            if let Some(time) = block.header.timestamp_utc() {
                value["timestamp_utc"] = json!(time.to_rfc3339());
            }
            value
        }
        Query::BlockByHash { hash } => {
            let header = client.get_block_by_hash(hash)?;
            let mut value = serde_json::to_value(&header)?;
            if let Some(time) = header.timestamp_utc() {
                value["timestamp_utc"] = json!(time.to_rfc3339());
            }
            value
        }
        Query::Transaction { hash } => serde_json::to_value(client.get_transaction(hash)?)?,
        Query::Receipt { hash } => serde_json::to_value(client.get_transaction_receipt(hash)?)?,
        Query::Balance { address, block } => json!(client.get_balance(address, *block)?),
        Query::Code { address, block } => json!(client.get_code(address, *block)?),
        Query::Storage { address, key, block } => {
            let slot = B256::from(key.to_be_bytes::<32>());
            json!(client.get_storage_at(address, slot, *block)?)
        }
        Query::VmTrace { hash } => {
            let tx = client.get_transaction(hash)?;
            serde_json::to_value(client.get_transaction_vm_trace(&tx)?)?
        }
        Query::CallTrace { hash } => {
            serde_json::to_value(client.get_transaction_call_trace(hash)?)?
        }
        Query::Network => json!({
            "network_id": client.get_network_id()?,
            "peer_count": client.get_peer_count()?,
            "client_version": client.get_client_version()?,
        }),
        Query::Call { method, params } => {
            let mut message = Message {
                method: method.clone(),
                params: params.clone(),
                ..Default::default()
            };
            client.call(&mut message)?;
            serde_json::to_value(&message)?
        }
    };

    Ok(output)
}

/// Validate query arguments before connecting
///
/// **Public** - can be called before execute_query for early validation
pub fn validate_query(query: &Query) -> Result<()> {
    match query {
        Query::BlockByHash { hash }
        | Query::Transaction { hash }
        | Query::Receipt { hash }
        | Query::VmTrace { hash }
        | Query::CallTrace { hash } => validate_hash(hash),
        Query::Balance { address, .. }
        | Query::Code { address, .. }
        | Query::Storage { address, .. } => validate_address(address),
        Query::Call { method, .. } if method.trim().is_empty() => {
            anyhow::bail!("Method name cannot be empty")
        }
        _ => Ok(()),
    }
}

/// Check that a target names an HTTP or WebSocket endpoint or an IPC socket
pub fn validate_rpc_target(target: &str) -> Result<()> {
    if target.is_empty() {
        anyhow::bail!("RPC endpoint cannot be empty");
    }

    Endpoint::parse(target)
        .map(|_| ())
        .with_context(|| format!("Unsupported RPC endpoint {:?}", target))
}

/// Basic hex validation of a 32-byte hash (with or without 0x prefix)
pub fn validate_hash(hash: &str) -> Result<()> {
    validate_hex(hash, 32, "Hash")
}

/// Basic hex validation of a 20-byte address (with or without 0x prefix)
pub fn validate_address(address: &str) -> Result<()> {
    validate_hex(address, 20, "Address")
}

fn validate_hex(value: &str, bytes: usize, what: &str) -> Result<()> {
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", what);
    }

    let digits = value.strip_prefix("0x").unwrap_or(value);

    if digits.len() != bytes * 2 {
        anyhow::bail!("{} must be {} bytes ({} hex characters)", what, bytes, bytes * 2);
    }

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("{} contains invalid characters", what);
    }

    Ok(())
}
