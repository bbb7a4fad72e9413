//! Scripted transport shared by the integration tests.
#![allow(dead_code)]

use ethnode_trace::client::NodeClient;
use ethnode_trace::ethereum::Schema;
use ethnode_trace::rpc::{
    JsonRpcError, JsonRpcResponse, Notification, Request, SubscriptionId, Transport,
};
use ethnode_trace::utils::config::ClientConfig;
use ethnode_trace::utils::error::{TransportError, METHOD_NOT_FOUND};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Result(Value),
    Error(i64, String),
    Broken,
}

/// Answers each method from a queue of scripted replies
///
/// The last reply of a method is repeated once the queue is down to it.
/// Unscripted methods fail with "method not found".
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<Request>>,
    inbound: Mutex<Option<Receiver<Notification>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, method: &str, result: Value) -> &Self {
        self.push(method, Reply::Result(result));
        self
    }

    pub fn reply_error(&self, method: &str, code: i64, message: &str) -> &Self {
        self.push(method, Reply::Error(code, message.to_string()));
        self
    }

    /// Make `method` fail as if the connection dropped
    pub fn break_method(&self, method: &str) -> &Self {
        self.push(method, Reply::Broken);
        self
    }

    /// Enable subscriptions; the returned sender feeds the inbound stream
    pub fn notifications(&self) -> Sender<Notification> {
        let (sender, receiver) = mpsc::channel();
        *self.inbound.lock().unwrap() = Some(receiver);
        sender
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn last_request(&self, method: &str) -> Option<Request> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == method)
            .cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_reply(&self, method: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(method)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Transport for MockTransport {
    fn send_raw_request(&self, request: &Request) -> Result<JsonRpcResponse, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.requests.lock().unwrap().push(request.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        match self.next_reply(&request.method) {
            Some(Reply::Result(result)) => Ok(JsonRpcResponse::success(id, result)),
            Some(Reply::Error(code, message)) => Ok(JsonRpcResponse::failure(
                id,
                JsonRpcError {
                    code,
                    message,
                    data: None,
                },
            )),
            Some(Reply::Broken) => Err(TransportError::Closed),
            None => Ok(JsonRpcResponse::failure(
                id,
                JsonRpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("the method {} does not exist/is not available", request.method),
                    data: None,
                },
            )),
        }
    }

    fn subscribe(&self, _id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError> {
        self.inbound
            .lock()
            .unwrap()
            .take()
            .ok_or(TransportError::SubscriptionsUnsupported)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        *self.inbound.lock().unwrap() = None;
        Ok(())
    }
}

pub fn fast_config() -> ClientConfig {
    ClientConfig::default()
        .with_request_timeout(Duration::from_secs(1))
        .with_poll_interval(Duration::from_millis(1))
        .with_poll_backoff(Duration::from_millis(5))
}

pub fn geth_client(mock: &Arc<MockTransport>) -> NodeClient {
    NodeClient::with_schema(mock.clone(), Schema::GETH, fast_config())
}

pub fn parity_client(mock: &Arc<MockTransport>) -> NodeClient {
    NodeClient::with_schema(mock.clone(), Schema::PARITY, fast_config())
}

pub const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";
pub const BLOCK_HASH: &str = "0xb3b20624f8f0f86eb50dd04688409e5cea4bd02d700bf6e79e9384d47d6a5a35";
pub const SENDER: &str = "0xa1e4380a3b1f749673e270229993ee55f35663b4";
pub const RECIPIENT: &str = "0x5df9b87991262f6ba471f09758cde1c0fc1de734";

pub fn notification(subscription: &str, number: &str) -> Notification {
    Notification {
        method: "eth_subscription".to_string(),
        params: serde_json::json!({
            "subscription": subscription,
            "result": {"number": number, "hash": BLOCK_HASH}
        }),
    }
}
