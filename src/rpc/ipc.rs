//! Streaming transport over a node's IPC socket.
//!
//! One reader thread owns the inbound half of the socket and feeds every
//! message to the shared [`Router`].

use super::router::{lock, Router};
use super::transport::Transport;
use super::types::{JsonRpcRequest, JsonRpcResponse, Notification, Request, SubscriptionId};
use crate::utils::error::TransportError;
use log::{debug, warn};
use serde_json::Value;
use std::io::{BufReader, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Transport speaking newline-delimited JSON-RPC over a Unix socket
pub struct IpcTransport {
    writer: Mutex<UnixStream>,
    router: Arc<Router>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl IpcTransport {
    /// Connect to the socket at `path` and start the reader thread
    pub fn connect(path: &Path, timeout: Duration) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path)?;
        Self::from_stream(stream, timeout)
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: UnixStream, timeout: Duration) -> Result<Self, TransportError> {
        let reader = stream.try_clone()?;
        let router = Arc::new(Router::default());

        let thread_router = Arc::clone(&router);
        thread::Builder::new()
            .name("ipc-reader".to_string())
            .spawn(move || read_loop(reader, &thread_router))?;

        Ok(Self {
            writer: Mutex::new(stream),
            router,
            next_id: AtomicU64::new(1),
            timeout,
        })
    }
}

fn read_loop(reader: impl Read, router: &Router) {
    let messages = serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter::<Value>();

    for message in messages {
        match message {
            Ok(message) => router.dispatch(message),
            Err(e) if e.is_eof() || e.is_io() => break,
            Err(e) => {
                warn!("IPC stream corrupted, closing: {}", e);
                break;
            }
        }
    }

    debug!("IPC reader exiting");
    router.shutdown();
}

impl Transport for IpcTransport {
    fn send_raw_request(&self, request: &Request) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_vec(&JsonRpcRequest::new(request, id))?;
        payload.push(b'\n');

        self.router.request(id, &request.method, self.timeout, || {
            lock(&self.writer).write_all(&payload).map_err(Into::into)
        })
    }

    fn subscribe(&self, id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError> {
        self.router.subscribe(id)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.router.mark_closed();

        match lock(&self.writer).shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for IpcTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::BufRead;

    fn pair() -> (IpcTransport, UnixStream) {
        let (client, server) = UnixStream::pair().unwrap();
        let transport = IpcTransport::from_stream(client, Duration::from_secs(5)).unwrap();
        (transport, server)
    }

    #[test]
    fn test_response_routed_by_id() {
        let (transport, server) = pair();

        let node = thread::spawn(move || {
            let mut lines = BufReader::new(server.try_clone().unwrap()).lines();
            let line = lines.next().unwrap().unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["method"], "eth_blockNumber");

            let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": "0x10"});
            let mut writer = server;
            writeln!(writer, "{}", reply).unwrap();
            writer
        });

        let value = transport
            .call_request(&Request::new("eth_blockNumber", vec![]))
            .unwrap();
        assert_eq!(value, json!("0x10"));
        drop(node.join().unwrap());
    }

    #[test]
    fn test_early_notifications_are_kept() {
        let (transport, mut server) = pair();

        let note = json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0xab", "result": {"number": "0x2"}}
        });
        writeln!(server, "{}", note).unwrap();

        // Give the reader a moment to park the notification in the backlog
        thread::sleep(Duration::from_millis(100));

        let inbound = transport.subscribe(&SubscriptionId("0xab".to_string())).unwrap();
        let received = inbound.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received.subscription(), Some("0xab"));
    }

    #[test]
    fn test_close_ends_subscriptions() {
        let (transport, server) = pair();
        let inbound = transport.subscribe(&SubscriptionId("0x1".to_string())).unwrap();

        drop(server);

        assert!(inbound.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(matches!(
            transport.call_request(&Request::new("eth_blockNumber", vec![])),
            Err(TransportError::Closed)
        ));
    }
}
