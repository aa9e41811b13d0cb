//! Presence subscription configuration.

use serde::{Deserialize, Serialize};

pub use lanyard_common::endpoints::{DEFAULT_ENDPOINT, DEFAULT_REST_BASE_URL};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// WebSocket URL of the realtime endpoint.
    pub endpoint: String,
    /// Discord user id (snowflake) to subscribe to.
    pub user_id: String,
    /// Base URL for one-shot REST lookups.
    pub rest_base_url: String,
    /// Timeout for establishing the socket, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            user_id: String::new(),
            rest_base_url: DEFAULT_REST_BASE_URL.into(),
            connect_timeout_ms: 10_000,
        }
    }
}
