//! Lanyard client configuration.
//!
//! TOML-based configuration with validation. Every section uses serde
//! defaults, so a config file only needs the values it overrides
//! (usually just `presence.user_id`).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lanyard_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    LanyardConfig, LoggingConfig, PresenceConfig, ReconnectConfig, CONFIG_SCHEMA_VERSION,
};

use std::path::Path;

use lanyard_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a commented default file if none exists yet.
pub fn load_config() -> Result<LanyardConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path and validate it.
pub fn load_config_from(path: &Path) -> Result<LanyardConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &LanyardConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
