//! Tests for the full validation pipeline.

use super::*;
use crate::schema::LanyardConfig;

#[test]
fn default_config_validates() {
    let config = LanyardConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn numeric_user_id_validates() {
    let mut config = LanyardConfig::default();
    config.presence.user_id = "1019243841498394654".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_non_numeric_user_id() {
    let mut config = LanyardConfig::default();
    config.presence.user_id = "dylan#0001".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.user_id"));
}

#[test]
fn catches_http_endpoint() {
    let mut config = LanyardConfig::default();
    config.presence.endpoint = "https://api.lanyard.rest/socket".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.endpoint"));
}

#[test]
fn catches_ws_rest_base_url() {
    let mut config = LanyardConfig::default();
    config.presence.rest_base_url = "wss://api.lanyard.rest/v1".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.rest_base_url"));
}

#[test]
fn catches_zero_connect_timeout() {
    let mut config = LanyardConfig::default();
    config.presence.connect_timeout_ms = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.connect_timeout_ms"));
}

#[test]
fn catches_max_delay_below_initial() {
    let mut config = LanyardConfig::default();
    config.reconnect.initial_delay_ms = 5000;
    config.reconnect.max_delay_ms = 1000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("reconnect.max_delay_ms"));
}

#[test]
fn catches_multiplier_below_one() {
    let mut config = LanyardConfig::default();
    config.reconnect.multiplier = 0.5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("reconnect.multiplier"));
}

#[test]
fn catches_nan_jitter() {
    let mut config = LanyardConfig::default();
    config.reconnect.jitter = f64::NAN;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("reconnect.jitter"));
}

#[test]
fn catches_unknown_log_level() {
    let mut config = LanyardConfig::default();
    config.logging.level = "verbose".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("logging.level"));
}

#[test]
fn log_level_is_case_insensitive() {
    let mut config = LanyardConfig::default();
    config.logging.level = "DEBUG".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = LanyardConfig::default();
    config.presence.user_id = "abc".into();
    config.reconnect.jitter = 2.0;
    config.logging.level = "loud".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("presence.user_id"));
    assert!(err.contains("reconnect.jitter"));
    assert!(err.contains("logging.level"));
}
