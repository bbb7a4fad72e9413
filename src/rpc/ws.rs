//! Streaming transport over a WebSocket connection.
//!
//! tungstenite sockets are not split into halves, so the reader thread and
//! writers share one socket behind a mutex. The reader holds it for at most
//! [`WS_READ_SLICE`] per read so writers are never starved.

use super::router::{lock, Router};
use super::transport::Transport;
use super::types::{JsonRpcRequest, JsonRpcResponse, Notification, Request, SubscriptionId};
use crate::utils::config::WS_READ_SLICE;
use crate::utils::error::TransportError;
use log::{debug, warn};
use serde_json::Value;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Transport speaking JSON-RPC text frames over `ws://` or `wss://`
pub struct WsTransport {
    socket: Arc<Mutex<Socket>>,
    router: Arc<Router>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl WsTransport {
    /// Perform the handshake with `url` and start the reader thread
    pub fn connect(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let (socket, response) = tungstenite::connect(url)?;
        debug!("WebSocket handshake with {} answered {}", url, response.status());

        set_read_timeout(&socket, WS_READ_SLICE)?;

        let socket = Arc::new(Mutex::new(socket));
        let router = Arc::new(Router::default());

        let thread_socket = Arc::clone(&socket);
        let thread_router = Arc::clone(&router);
        thread::Builder::new()
            .name("ws-reader".to_string())
            .spawn(move || read_loop(&thread_socket, &thread_router))?;

        Ok(Self {
            socket,
            router,
            next_id: AtomicU64::new(1),
            timeout,
        })
    }
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> std::io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

fn read_loop(socket: &Mutex<Socket>, router: &Router) {
    while !router.is_closed() {
        let read = lock(socket).read();

        match read {
            Ok(Message::Text(text)) => dispatch(router, text.as_bytes()),
            Ok(Message::Binary(data)) => dispatch(router, &data),
            Ok(Message::Close(frame)) => {
                debug!("Node closed the WebSocket: {:?}", frame);
                break;
            }
            // Pings are answered by tungstenite on the next read or write
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                // Let a waiting writer take the socket
                thread::sleep(Duration::from_millis(1));
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
            Err(e) => {
                warn!("WebSocket stream failed, closing: {}", e);
                break;
            }
        }
    }

    debug!("WebSocket reader exiting");
    router.shutdown();
}

fn dispatch(router: &Router, payload: &[u8]) {
    match serde_json::from_slice::<Value>(payload) {
        Ok(message) => router.dispatch(message),
        Err(e) => warn!("Ignoring non-JSON WebSocket frame: {}", e),
    }
}

impl Transport for WsTransport {
    fn send_raw_request(&self, request: &Request) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::to_string(&JsonRpcRequest::new(request, id))?;

        self.router.request(id, &request.method, self.timeout, || {
            lock(&self.socket)
                .send(Message::text(payload))
                .map_err(Into::into)
        })
    }

    fn subscribe(&self, id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError> {
        self.router.subscribe(id)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.router.mark_closed();

        match lock(&self.socket).close(None) {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;

    /// Accept one WebSocket client and hand the server side to `node`
    fn serve<F>(node: F) -> (String, thread::JoinHandle<()>)
    where
        F: FnOnce(WebSocket<TcpStream>) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            node(tungstenite::accept(stream).unwrap());
        });

        (url, handle)
    }

    fn read_request(ws: &mut WebSocket<TcpStream>) -> Value {
        loop {
            if let Message::Text(text) = ws.read().unwrap() {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[test]
    fn test_response_routed_by_id() {
        let (url, node) = serve(|mut ws| {
            let request = read_request(&mut ws);
            assert_eq!(request["method"], "eth_blockNumber");

            let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": "0x10"});
            ws.send(Message::text(reply.to_string())).unwrap();
            let _ = ws.read();
        });

        let transport = WsTransport::connect(&url, Duration::from_secs(5)).unwrap();
        let value = transport
            .call_request(&Request::new("eth_blockNumber", vec![]))
            .unwrap();
        assert_eq!(value, json!("0x10"));

        transport.close().unwrap();
        node.join().unwrap();
    }

    #[test]
    fn test_notifications_reach_subscription() {
        let (url, node) = serve(|mut ws| {
            let note = json!({
                "jsonrpc": "2.0",
                "method": "eth_subscription",
                "params": {"subscription": "0xab", "result": {"number": "0x2"}}
            });
            ws.send(Message::text(note.to_string())).unwrap();
            let _ = ws.read();
        });

        let transport = WsTransport::connect(&url, Duration::from_secs(5)).unwrap();
        // Parked in the backlog if it arrives before the channel exists
        let inbound = transport.subscribe(&SubscriptionId("0xab".to_string())).unwrap();
        let received = inbound.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(received.subscription(), Some("0xab"));

        transport.close().unwrap();
        node.join().unwrap();
    }

    #[test]
    fn test_node_hangup_ends_subscriptions() {
        let (url, node) = serve(|mut ws| {
            let _ = ws.close(None);
        });

        let transport = WsTransport::connect(&url, Duration::from_secs(5)).unwrap();
        let inbound = transport.subscribe(&SubscriptionId("0x1".to_string()));
        node.join().unwrap();

        if let Ok(inbound) = inbound {
            assert!(inbound.recv_timeout(Duration::from_secs(5)).is_err());
        }
        assert!(transport
            .call_request(&Request::new("eth_blockNumber", vec![]))
            .is_err());
    }
}
