//! ethnode-trace
//!
//! Read-path client for Ethereum nodes that speaks both the geth and the
//! parity dialect behind one API.
//!
//! The crate provides:
//! - [`client::NodeClient`], which detects the node's dialect once and
//!   exposes block, transaction, state and trace queries
//! - VM trace reconstruction that flattens parity's nested traces into
//!   execution-ordered steps
//! - Block-height subscriptions over push notifications with a polling
//!   fallback
//!
//! ## Getting Started
//!
//! ```no_run
//! use ethnode_trace::client::NodeClient;
//!
//! let client = NodeClient::dial("http://localhost:8545")?;
//! println!("latest block: {}", client.current_block_number()?);
//! # Ok::<(), ethnode_trace::utils::error::ClientError>(())
//! ```

pub mod client;
pub mod commands;
pub mod ethereum;
pub mod rpc;
pub mod trace;
pub mod utils;

pub use client::{BlockSubscription, NodeClient, SubscriptionMode};
pub use ethereum::{BlockNumber, Dialect, Schema};
pub use utils::{ClientConfig, ClientError};
