//! JSON-RPC transports for communicating with Ethereum nodes.

pub mod http;
#[cfg(unix)]
pub mod ipc;
mod router;
pub mod transport;
pub mod types;
pub mod ws;

// Re-export main types
pub use http::HttpTransport;
#[cfg(unix)]
pub use ipc::IpcTransport;
pub use transport::{dial, Endpoint, Transport};
pub use ws::WsTransport;
pub use types::{JsonRpcError, JsonRpcResponse, Message, Notification, Request, SubscriptionId};
