//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::fmt;
use thiserror::Error;

/// JSON-RPC error code for an unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Errors that can occur while talking to the node
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("notifications are not supported by this transport")]
    SubscriptionsUnsupported,

    #[error("request {0} timed out")]
    Timeout(String),

    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// True if the node rejected the method itself rather than its arguments
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, TransportError::Rpc { code, .. } if *code == METHOD_NOT_FOUND)
    }
}

/// Errors raised while reconstructing a VM trace
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceError {
    #[error("program counter {pc} is outside of the {code_len} byte code")]
    PcOutOfRange { pc: u64, code_len: usize },

    #[error("invalid stack word {0:?}")]
    InvalidStackWord(String),

    #[error("invalid memory word {0:?}")]
    InvalidMemoryWord(String),
}

/// Operation name and primary argument attached to every client error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub operation: &'static str,
    pub argument: Option<String>,
}

impl CallContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            argument: None,
        }
    }

    pub fn with_argument(operation: &'static str, argument: impl ToString) -> Self {
        Self {
            operation,
            argument: Some(argument.to_string()),
        }
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{} [{}]", self.operation, argument),
            None => f.write_str(self.operation),
        }
    }
}

/// Errors surfaced by the node client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("dial ethereum rpc: {0}")]
    Dial(#[source] TransportError),

    #[error("{context}: {source}")]
    Call {
        context: CallContext,
        #[source]
        source: TransportError,
    },

    #[error("{context}: not found")]
    NotFound { context: CallContext },

    #[error("{context}: failed to decode result: {source}")]
    Decode {
        context: CallContext,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Trace {
        context: CallContext,
        #[source]
        source: TraceError,
    },

    #[error("unrecognized block number selector {0}")]
    InvalidBlockNumber(i64),

    #[error("listen for subscriptions: {0}")]
    Subscribe(#[source] TransportError),

    #[error("failed to start subscription worker: {0}")]
    Spawn(#[source] std::io::Error),
}
