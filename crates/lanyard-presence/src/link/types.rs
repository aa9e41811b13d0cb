//! Link configuration and observable state.

use std::time::Duration;

use crate::transport::CloseInfo;

use super::backoff::ReconnectPolicy;

pub use lanyard_common::endpoints::DEFAULT_ENDPOINT;

/// Everything a link needs; fixed for the link's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// Realtime socket URL.
    pub endpoint: String,
    /// Discord user id to subscribe to.
    pub user_id: String,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl LinkConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_id: user_id.into(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Disconnected,
    /// Opening a socket. `attempt` is 0 for the first connection and counts
    /// consecutive failures since the last completed handshake.
    Connecting { attempt: u32 },
    /// Socket open and subscribe sent; waiting for Hello.
    AwaitingHello,
    Subscribed { heartbeat_interval: Duration },
    /// Waiting `delay` before the next attempt.
    Reconnecting {
        attempt: u32,
        delay: Duration,
        /// The close or connect failure that caused this wait.
        last_close: Option<CloseInfo>,
    },
    /// Shut down for good.
    Closed,
}

impl LinkState {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed { .. })
    }
}
