//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Lanyard presence client configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[presence]
# Discord user id to mirror. Required by `lanyard watch` and `lanyard fetch`.
user_id = ""
# endpoint = "wss://api.lanyard.rest/socket"
# rest_base_url = "https://api.lanyard.rest/v1"
# connect_timeout_ms = 10000   # 1-120000

[reconnect]
# initial_delay_ms = 3000      # 100-600000
# max_delay_ms = 60000         # >= initial_delay_ms
# multiplier = 2.0             # 1.0-10.0, 1.0 = fixed delay
# jitter = 0.2                 # 0.0-1.0

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
