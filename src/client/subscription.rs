//! Block-height subscriptions.
//!
//! Two exclusive modes deliver new block numbers on the same channel type:
//! - Push: `eth_subscribe("newHeads")`, decoding each notification
//! - Poll: `eth_blockNumber` in a loop, emitting every height in between
//!
//! Push is tried first and polling is the fallback when the subscribe call
//! fails. The decision is made once per subscription.

use super::node::NodeClient;
use crate::ethereum::geth;
use crate::rpc::types::{Notification, SubscriptionId};
use crate::utils::config::CANCEL_CHECK_INTERVAL;
use crate::utils::error::{CallContext, ClientError};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// How block numbers are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    Push,
    Poll,
}

/// Handle to a running block-height subscription
///
/// Dropping the handle cancels the subscription.
#[derive(Debug)]
pub struct BlockSubscription {
    receiver: Receiver<u64>,
    mode: SubscriptionMode,
    token: CancellationToken,
}

impl BlockSubscription {
    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    /// Block until the next height arrives
    ///
    /// Fails once the worker has stopped.
    pub fn recv(&self) -> Result<u64, RecvError> {
        self.receiver.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<u64, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<u64, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Heights until the subscription ends
    pub fn iter(&self) -> mpsc::Iter<'_, u64> {
        self.receiver.iter()
    }

    /// Stop the worker of this subscription only
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for BlockSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) fn start(client: &NodeClient, force_poll: bool) -> Result<BlockSubscription, ClientError> {
    let token = client.token().child_token();
    let (sender, receiver) = mpsc::channel();

    if !force_poll {
        match open_push(client) {
            Ok((id, inbound)) => {
                info!("Subscribed to new heads ({})", id);
                let worker = PushWorker {
                    client: client.clone(),
                    id,
                    inbound,
                    out: sender,
                    token: token.clone(),
                };
                spawn("block-push", move || worker.run())?;

                return Ok(BlockSubscription {
                    receiver,
                    mode: SubscriptionMode::Push,
                    token,
                });
            }
            Err(err) => info!("Push subscription unavailable ({}), falling back to polling", err),
        }
    }

    let poller = client.clone();
    let worker_token = token.clone();
    let interval = client.config().poll_interval;
    let backoff = client.config().poll_backoff;

    spawn("block-poll", move || {
        poll_loop(
            || poller.current_block_number(),
            sender,
            worker_token,
            interval,
            backoff,
        )
    })?;

    Ok(BlockSubscription {
        receiver,
        mode: SubscriptionMode::Poll,
        token,
    })
}

fn spawn<F>(name: &str, work: F) -> Result<(), ClientError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map(|_| ())
        .map_err(ClientError::Spawn)
}

fn open_push(client: &NodeClient) -> Result<(SubscriptionId, Receiver<Notification>), ClientError> {
    let id = client.execute(
        client.schema().pubsub().subscribe(),
        CallContext::new("subscribe new heads"),
    )?;
    let inbound = client
        .transport()
        .subscribe(&id)
        .map_err(ClientError::Subscribe)?;

    Ok((id, inbound))
}

struct PushWorker {
    client: NodeClient,
    id: SubscriptionId,
    inbound: Receiver<Notification>,
    out: Sender<u64>,
    token: CancellationToken,
}

impl PushWorker {
    fn run(self) {
        while !self.token.is_cancelled() {
            let notification = match self.inbound.recv_timeout(CANCEL_CHECK_INTERVAL) {
                Ok(notification) => notification,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("Notification stream of {} closed", self.id);
                    return;
                }
            };

            match geth::decode_new_head(notification.params) {
                Ok(number) => {
                    if self.out.send(number).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("Dropping undecodable notification on {}: {}", self.id, err),
            }
        }

        self.unsubscribe();
    }

    fn unsubscribe(&self) {
        if self.client.token().is_cancelled() {
            return;
        }

        let call = self.client.schema().pubsub().unsubscribe(&self.id);
        match self
            .client
            .execute(call, CallContext::with_argument("unsubscribe", &self.id))
        {
            Ok(_) => debug!("Unsubscribed {}", self.id),
            Err(err) => debug!("{}", err),
        }
    }
}

/// Emit every height after the baseline, in order
///
/// A zero height does not count as a baseline. Failed reads are logged
/// and retried after `backoff`.
pub(crate) fn poll_loop<F>(
    mut fetch: F,
    out: Sender<u64>,
    token: CancellationToken,
    interval: Duration,
    backoff: Duration,
) where
    F: FnMut() -> Result<u64, ClientError>,
{
    let mut last_seen: Option<u64> = None;

    while !token.is_cancelled() {
        let pause = match fetch() {
            Ok(0) => interval,
            Ok(current) => {
                match last_seen {
                    None => {
                        debug!("Polling for blocks after {}", current);
                        last_seen = Some(current);
                    }
                    Some(last) if current > last => {
                        for number in last + 1..=current {
                            if out.send(number).is_err() {
                                return;
                            }
                        }
                        last_seen = Some(current);
                    }
                    Some(_) => {}
                }
                interval
            }
            Err(err) => {
                warn!("Polling block number failed: {}", err);
                backoff
            }
        };

        if !sleep_unless_cancelled(&token, pause) {
            break;
        }
    }

    debug!("Block poller stopped");
}

/// Sleep in short slices; false if cancelled meanwhile
fn sleep_unless_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_CHECK_INTERVAL));
    }
}
