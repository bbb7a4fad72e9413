//! Configuration and constants for the client.

use std::time::Duration;

/// Default timeout for RPC requests
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between two block-number polls in poll mode
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Delay before retrying after a failed block-number poll
pub const DEFAULT_POLL_BACKOFF: Duration = Duration::from_secs(1);

/// How often a push worker wakes up to check for cancellation
pub const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Longest time the WebSocket reader holds the socket per read
pub const WS_READ_SLICE: Duration = Duration::from_millis(50);

/// Notifications kept for a subscription id nobody listens to yet
pub const MAX_NOTIFICATION_BACKLOG: usize = 64;

/// Default endpoint used by the CLI
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Tunables for a node client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound for one request/response round trip
    pub request_timeout: Duration,

    /// Poll cadence of the fallback subscription
    pub poll_interval: Duration,

    /// Wait after a failed poll
    pub poll_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_RPC_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_backoff: DEFAULT_POLL_BACKOFF,
        }
    }
}

impl ClientConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_backoff(mut self, backoff: Duration) -> Self {
        self.poll_backoff = backoff;
        self
    }
}
