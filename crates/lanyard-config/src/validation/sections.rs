//! Per-section validators.

use crate::schema::LanyardConfig;

use super::helpers::{validate_range, validate_range_f64, validate_scheme};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate presence constraints.
pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &LanyardConfig) {
    let presence = &config.presence;
    validate_scheme(errors, "presence.endpoint", &presence.endpoint, &["ws://", "wss://"]);
    validate_scheme(
        errors,
        "presence.rest_base_url",
        &presence.rest_base_url,
        &["http://", "https://"],
    );
    // Empty is allowed here; commands that need an id check for it.
    if !presence.user_id.is_empty() && !presence.user_id.bytes().all(|b| b.is_ascii_digit()) {
        errors.push(format!(
            "presence.user_id = {:?} must be a numeric Discord id",
            presence.user_id
        ));
    }
    validate_range(
        errors,
        "presence.connect_timeout_ms",
        presence.connect_timeout_ms,
        1,
        120_000,
    );
}

/// Validate reconnect backoff constraints.
pub(crate) fn validate_reconnect(errors: &mut Vec<String>, config: &LanyardConfig) {
    let reconnect = &config.reconnect;
    validate_range(
        errors,
        "reconnect.initial_delay_ms",
        reconnect.initial_delay_ms,
        100,
        600_000,
    );
    if reconnect.max_delay_ms < reconnect.initial_delay_ms {
        errors.push(format!(
            "reconnect.max_delay_ms = {} must be >= reconnect.initial_delay_ms = {}",
            reconnect.max_delay_ms, reconnect.initial_delay_ms
        ));
    }
    validate_range_f64(errors, "reconnect.multiplier", reconnect.multiplier, 1.0, 10.0);
    validate_range_f64(errors, "reconnect.jitter", reconnect.jitter, 0.0, 1.0);
}

/// Validate logging constraints.
pub(crate) fn validate_logging(errors: &mut Vec<String>, config: &LanyardConfig) {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level = {:?} must be one of: {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}
