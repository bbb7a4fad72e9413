//! HTTP transport for communicating with a node RPC endpoint.

use super::transport::Transport;
use super::types::{JsonRpcRequest, JsonRpcResponse, Notification, Request, SubscriptionId};
use crate::utils::error::TransportError;
use log::debug;
use reqwest::blocking::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Request/response transport over HTTP POST
///
/// HTTP has no server push, so [`Transport::subscribe`] always fails and
/// the client falls back to polling.
pub struct HttpTransport {
    client: Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.rpc_url
    }
}

impl Transport for HttpTransport {
    fn send_raw_request(&self, request: &Request) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = JsonRpcRequest::new(request, id);

        debug!("RPC request: {} {:?}", request.method, request.params);

        let response = self.client.post(&self.rpc_url).json(&envelope).send()?;

        // Check HTTP status
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus {
                status: response.status().as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        // An explicit `null` result stays `Some(Value::Null)`
        Ok(response.json()?)
    }

    fn subscribe(&self, _id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError> {
        Err(TransportError::SubscriptionsUnsupported)
    }

    fn close(&self) -> Result<(), TransportError> {
        debug!("Closing HTTP transport for {}", self.rpc_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_unsupported() {
        let transport = HttpTransport::new("http://localhost:8545", Duration::from_secs(1)).unwrap();
        let id = SubscriptionId("0x1".to_string());

        assert!(matches!(
            transport.subscribe(&id),
            Err(TransportError::SubscriptionsUnsupported)
        ));
        assert_eq!(transport.url(), "http://localhost:8545");
    }
}
