//! ethnode-trace CLI
//!
//! Queries geth- and parity-family nodes through one interface and
//! reconstructs per-instruction VM traces of transactions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use serde_json::Value;
use std::time::Duration;

use ethnode_trace::commands::{execute_query, execute_watch, Query, WatchArgs};
use ethnode_trace::ethereum::BlockNumber;
use ethnode_trace::utils::config::{ClientConfig, DEFAULT_RPC_URL};
use alloy_primitives::U256;

/// ethnode-trace - dialect-agnostic Ethereum node client
#[derive(Parser, Debug)]
#[command(name = "ethnode-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Node endpoint: http(s) URL, ws(s) URL, ipc:// URL or IPC socket path
    #[arg(short, long, global = true, env = "ETH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Poll interval in milliseconds when polling for blocks
    #[arg(long, global = true, default_value = "200")]
    poll_interval: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show which dialect the node speaks
    Dialect,

    /// Print the latest block number
    BlockNumber,

    /// Fetch a block with its transactions
    Block {
        /// Height (decimal or 0x hex), latest, pending or earliest
        #[arg(default_value = "latest")]
        number: BlockNumber,
    },

    /// Fetch a block header by hash
    BlockByHash {
        /// Block hash
        hash: String,
    },

    /// Fetch a transaction
    Tx {
        /// Transaction hash
        hash: String,
    },

    /// Fetch a transaction receipt
    Receipt {
        /// Transaction hash
        hash: String,
    },

    /// Fetch an account balance
    Balance {
        /// Account address
        address: String,

        /// Block to query
        #[arg(short, long, default_value = "latest")]
        block: BlockNumber,
    },

    /// Fetch contract bytecode
    Code {
        /// Contract address
        address: String,

        /// Block to query
        #[arg(short, long, default_value = "latest")]
        block: BlockNumber,
    },

    /// Read one storage slot
    Storage {
        /// Contract address
        address: String,

        /// Slot (decimal or 0x hex)
        key: U256,

        /// Block to query
        #[arg(short, long, default_value = "latest")]
        block: BlockNumber,
    },

    /// Reconstruct the per-instruction trace of a transaction
    VmTrace {
        /// Transaction hash
        hash: String,
    },

    /// List the call frames of a transaction
    CallTrace {
        /// Transaction hash
        hash: String,
    },

    /// Show network id, peer count and client version
    Network,

    /// Forward a raw JSON-RPC call
    Call {
        /// Method name
        method: String,

        /// Parameters as a JSON array
        params: Option<String>,
    },

    /// Print new block numbers as they arrive
    Watch {
        /// Poll instead of subscribing to notifications
        #[arg(long)]
        poll: bool,

        /// Stop after this many blocks
        #[arg(short, long)]
        count: Option<usize>,
    },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let config = ClientConfig::default()
        .with_request_timeout(Duration::from_secs(cli.timeout))
        .with_poll_interval(Duration::from_millis(cli.poll_interval));

    // Execute command
    let query = match cli.command {
        Commands::Watch { poll, count } => {
            let args = WatchArgs {
                force_poll: poll,
                count,
            };
            return execute_watch(&cli.rpc, config, &args);
        }
        Commands::Dialect => Query::Dialect,
        Commands::BlockNumber => Query::BlockNumber,
        Commands::Block { number } => Query::Block { number },
        Commands::BlockByHash { hash } => Query::BlockByHash { hash },
        Commands::Tx { hash } => Query::Transaction { hash },
        Commands::Receipt { hash } => Query::Receipt { hash },
        Commands::Balance { address, block } => Query::Balance { address, block },
        Commands::Code { address, block } => Query::Code { address, block },
        Commands::Storage {
            address,
            key,
            block,
        } => Query::Storage {
            address,
            key,
            block,
        },
        Commands::VmTrace { hash } => Query::VmTrace { hash },
        Commands::CallTrace { hash } => Query::CallTrace { hash },
        Commands::Network => Query::Network,
        Commands::Call { method, params } => Query::Call {
            method,
            params: parse_params(params.as_deref())?,
        },
    };

    execute_query(&cli.rpc, config, &query)
}

/// Parse raw call parameters
///
/// **Private** - internal helper for the call command
fn parse_params(raw: Option<&str>) -> Result<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Parameters must be valid JSON: {}", e))?;
            Ok(Some(value))
        }
    }
}
