use serde::{Deserialize, Serialize};

/// Backoff applied between reconnect attempts.
///
/// `multiplier = 1.0` with `jitter = 0.0` gives a fixed delay of
/// `initial_delay_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Fraction of each delay (0.0-1.0) that may be randomly shaved off.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}
