//! Transport abstraction shared by every node connection.

use super::http::HttpTransport;
use super::ws::WsTransport;
use super::types::{JsonRpcResponse, Notification, Request, SubscriptionId};
use crate::utils::error::TransportError;
use log::debug;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A JSON-RPC connection to a node
///
/// Implementations must be safe to share between in-flight calls and
/// subscription workers.
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response envelope
    fn send_raw_request(&self, request: &Request) -> Result<JsonRpcResponse, TransportError>;

    /// Open the inbound notification stream of a subscription
    fn subscribe(&self, id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError>;

    /// Release the connection
    fn close(&self) -> Result<(), TransportError>;

    /// Send one request and return its `result`, mapping an `error` object
    /// to [`TransportError::Rpc`]
    fn call_request(&self, request: &Request) -> Result<Value, TransportError> {
        let response = self.send_raw_request(request)?;

        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

/// Where a target string points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Http(Url),
    Ws(Url),
    Ipc(PathBuf),
}

impl Endpoint {
    /// Detect the transport from a target string
    pub fn parse(target: &str) -> Result<Self, TransportError> {
        match Url::parse(target) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Endpoint::Http(url)),
                "ws" | "wss" => Ok(Endpoint::Ws(url)),
                "ipc" | "unix" => Ok(Endpoint::Ipc(PathBuf::from(url.path()))),
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Ok(Endpoint::Ipc(PathBuf::from(target))),
                _ => Err(TransportError::UnsupportedEndpoint(target.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) if !target.is_empty() => {
                Ok(Endpoint::Ipc(PathBuf::from(target)))
            }
            Err(_) => Err(TransportError::UnsupportedEndpoint(target.to_string())),
        }
    }
}

/// Connect to a node, picking HTTP, WebSocket or IPC from the target
pub fn dial(target: &str, timeout: Duration) -> Result<Arc<dyn Transport>, TransportError> {
    match Endpoint::parse(target)? {
        Endpoint::Http(url) => {
            debug!("Dialing HTTP endpoint {}", url);
            Ok(Arc::new(HttpTransport::new(url.as_str(), timeout)?))
        }
        Endpoint::Ws(url) => {
            debug!("Dialing WebSocket endpoint {}", url);
            Ok(Arc::new(WsTransport::connect(url.as_str(), timeout)?))
        }
        Endpoint::Ipc(path) => dial_ipc(path, timeout),
    }
}

#[cfg(unix)]
fn dial_ipc(path: PathBuf, timeout: Duration) -> Result<Arc<dyn Transport>, TransportError> {
    debug!("Dialing IPC endpoint {}", path.display());
    Ok(Arc::new(super::ipc::IpcTransport::connect(&path, timeout)?))
}

#[cfg(not(unix))]
fn dial_ipc(path: PathBuf, _timeout: Duration) -> Result<Arc<dyn Transport>, TransportError> {
    Err(TransportError::UnsupportedEndpoint(
        path.display().to_string(),
    ))
}
