//! Turns the file config plus CLI overrides into runtime settings.

use std::path::Path;
use std::time::Duration;

use lanyard_common::{ConfigError, LanyardError};
use lanyard_config::{LanyardConfig, ReconnectConfig};
use lanyard_presence::{LinkConfig, ReconnectPolicy, RestClient};

/// Used when neither the flag, the config file nor `RUST_LOG` says otherwise.
pub const DEFAULT_LOG_DIRECTIVE: &str = "lanyard=info";

pub fn load(path: Option<&Path>) -> Result<LanyardConfig, ConfigError> {
    match path {
        Some(path) => lanyard_config::load_config_from(path),
        None => lanyard_config::load_config(),
    }
}

/// Filter directive for the subscriber. `None` defers to `RUST_LOG`.
///
/// A bare level is scoped to the lanyard crates; anything containing `=`
/// is passed through as written.
pub fn log_directive(flag: Option<&str>, config_level: Option<&str>) -> Option<String> {
    let raw = [flag, config_level]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())?;
    if raw.contains('=') {
        Some(raw.to_string())
    } else {
        Some(format!("lanyard={raw}"))
    }
}

/// Apply `--user-id` and re-validate, since the override bypassed the file.
pub fn apply_overrides(
    config: &mut LanyardConfig,
    user_id: Option<&str>,
) -> Result<(), ConfigError> {
    if let Some(id) = user_id {
        config.presence.user_id = id.trim().to_string();
    }
    lanyard_config::validation::validate(config)
}

pub fn require_user_id(config: &LanyardConfig) -> Result<&str, LanyardError> {
    let id = config.presence.user_id.trim();
    if id.is_empty() {
        return Err(ConfigError::ValidationError(
            "no user id: set presence.user_id in the config file or pass --user-id".into(),
        )
        .into());
    }
    Ok(id)
}

pub fn reconnect_policy(config: &ReconnectConfig) -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay: Duration::from_millis(config.initial_delay_ms),
        max_delay: Duration::from_millis(config.max_delay_ms),
        multiplier: config.multiplier,
        jitter: config.jitter,
    }
}

pub fn link_config(config: &LanyardConfig) -> Result<LinkConfig, LanyardError> {
    let user_id = require_user_id(config)?;
    Ok(LinkConfig {
        endpoint: config.presence.endpoint.clone(),
        user_id: user_id.to_string(),
        connect_timeout: Duration::from_millis(config.presence.connect_timeout_ms),
        reconnect: reconnect_policy(&config.reconnect),
    })
}

pub fn rest_client(config: &LanyardConfig) -> Result<RestClient, LanyardError> {
    let timeout = Duration::from_millis(config.presence.connect_timeout_ms);
    Ok(RestClient::new(config.presence.rest_base_url.clone(), timeout)?)
}
