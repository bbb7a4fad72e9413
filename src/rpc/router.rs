//! Inbound message routing for streaming transports.
//!
//! A streaming transport has one reader thread feeding every inbound
//! message to [`Router::dispatch`]. Responses go to the caller waiting on
//! the matching id, notifications to the channel registered for their
//! subscription id. [`Router::shutdown`] drops every pending caller and
//! every subscription channel, which is how workers observe a closed
//! connection.

use super::types::{JsonRpcResponse, Notification, SubscriptionId};
use crate::utils::config::MAX_NOTIFICATION_BACKLOG;
use crate::utils::error::TransportError;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct Router {
    pending: Mutex<HashMap<u64, Sender<JsonRpcResponse>>>,
    subscriptions: Mutex<HashMap<String, Sender<Notification>>>,
    backlog: Mutex<HashMap<String, Vec<Notification>>>,
    closed: AtomicBool,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Router {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Register a waiter for `id`, run `write`, then wait for the response
    ///
    /// The waiter is registered before writing so a fast reply is never lost.
    pub(crate) fn request<F>(
        &self,
        id: u64,
        method: &str,
        timeout: Duration,
        write: F,
    ) -> Result<JsonRpcResponse, TransportError>
    where
        F: FnOnce() -> Result<(), TransportError>,
    {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let (sender, receiver) = mpsc::channel();
        lock(&self.pending).insert(id, sender);

        if let Err(e) = write() {
            lock(&self.pending).remove(&id);
            return Err(e);
        }

        match receiver.recv_timeout(timeout) {
            Ok(response) => Ok(response),
            Err(RecvTimeoutError::Timeout) => {
                lock(&self.pending).remove(&id);
                Err(TransportError::Timeout(method.to_string()))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    /// Open the notification channel of a subscription
    ///
    /// Notifications that arrived before this call are delivered first.
    pub(crate) fn subscribe(&self, id: &SubscriptionId) -> Result<Receiver<Notification>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let (sender, receiver) = mpsc::channel();

        let mut subscriptions = lock(&self.subscriptions);
        if let Some(early) = lock(&self.backlog).remove(id.as_str()) {
            for notification in early {
                let _ = sender.send(notification);
            }
        }
        subscriptions.insert(id.as_str().to_owned(), sender);

        Ok(receiver)
    }

    pub(crate) fn dispatch(&self, message: Value) {
        if let Some(id) = message.get("id").and_then(Value::as_u64) {
            match serde_json::from_value::<JsonRpcResponse>(message) {
                Ok(response) => {
                    if let Some(waiter) = lock(&self.pending).remove(&id) {
                        let _ = waiter.send(response);
                    } else {
                        debug!("Dropping response for unknown request {}", id);
                    }
                }
                Err(e) => warn!("Malformed response for request {}: {}", id, e),
            }
            return;
        }

        let notification = match serde_json::from_value::<Notification>(message) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("Ignoring unrecognized inbound message: {}", e);
                return;
            }
        };

        let Some(id) = notification.subscription().map(str::to_owned) else {
            debug!("Notification {} carries no subscription id", notification.method);
            return;
        };

        let mut subscriptions = lock(&self.subscriptions);
        if let Some(sender) = subscriptions.get(&id) {
            if sender.send(notification).is_err() {
                subscriptions.remove(&id);
            }
            return;
        }

        // The notification may race the subscribe() that registers its channel.
        // Lock order is subscriptions, then backlog.
        let mut backlog = lock(&self.backlog);
        let queue = backlog.entry(id).or_default();
        if queue.len() < MAX_NOTIFICATION_BACKLOG {
            queue.push(notification);
        }
    }

    pub(crate) fn shutdown(&self) {
        self.mark_closed();
        lock(&self.pending).clear();
        lock(&self.subscriptions).clear();
        lock(&self.backlog).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn note(subscription: &str, number: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": subscription, "result": {"number": format!("{:#x}", number)}}
        })
    }

    #[test]
    fn test_response_reaches_waiter() {
        let router = Arc::new(Router::default());
        let reader = Arc::clone(&router);

        let response = router
            .request(7, "eth_chainId", Duration::from_secs(5), move || {
                thread::spawn(move || {
                    reader.dispatch(json!({"jsonrpc": "2.0", "id": 7, "result": "0x1"}));
                });
                Ok(())
            })
            .unwrap();

        assert_eq!(response.result, Some(json!("0x1")));
    }

    #[test]
    fn test_failed_write_unregisters_waiter() {
        let router = Router::default();

        let result = router.request(1, "eth_chainId", Duration::from_secs(5), || {
            Err(TransportError::Closed)
        });

        assert!(matches!(result, Err(TransportError::Closed)));
        assert!(lock(&router.pending).is_empty());
    }

    #[test]
    fn test_unanswered_request_times_out() {
        let router = Router::default();

        let result = router.request(3, "eth_syncing", Duration::from_millis(10), || Ok(()));

        assert!(matches!(result, Err(TransportError::Timeout(method)) if method == "eth_syncing"));
        assert!(lock(&router.pending).is_empty());
    }

    #[test]
    fn test_backlog_delivered_in_order_then_live() {
        let router = Router::default();
        router.dispatch(note("0xab", 1));
        router.dispatch(note("0xab", 2));

        let inbound = router.subscribe(&SubscriptionId("0xab".to_string())).unwrap();
        router.dispatch(note("0xab", 3));
        router.dispatch(note("0xcd", 9));

        let numbers: Vec<Value> = inbound
            .try_iter()
            .map(|n| n.params["result"]["number"].clone())
            .collect();
        assert_eq!(numbers, vec![json!("0x1"), json!("0x2"), json!("0x3")]);
    }

    #[test]
    fn test_backlog_is_bounded() {
        let router = Router::default();
        for number in 0..(MAX_NOTIFICATION_BACKLOG as u64 + 10) {
            router.dispatch(note("0x1", number));
        }

        let inbound = router.subscribe(&SubscriptionId("0x1".to_string())).unwrap();
        assert_eq!(inbound.try_iter().count(), MAX_NOTIFICATION_BACKLOG);
    }

    #[test]
    fn test_shutdown_rejects_new_work() {
        let router = Router::default();
        let inbound = router.subscribe(&SubscriptionId("0x1".to_string())).unwrap();

        router.shutdown();

        assert!(inbound.recv_timeout(Duration::from_secs(1)).is_err());
        assert!(matches!(
            router.subscribe(&SubscriptionId("0x2".to_string())),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            router.request(1, "eth_chainId", Duration::from_secs(1), || Ok(())),
            Err(TransportError::Closed)
        ));
    }
}
