//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod presence;
mod reconnect;

pub use logging::*;
pub use presence::*;
pub use reconnect::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanyardConfig {
    pub presence: PresenceConfig,
    pub reconnect: ReconnectConfig,
    pub logging: LoggingConfig,
}
