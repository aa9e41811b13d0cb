//! Public Lanyard endpoints shared by the config defaults and the link.

/// Lanyard realtime socket.
pub const DEFAULT_ENDPOINT: &str = "wss://api.lanyard.rest/socket";

/// Lanyard REST API root.
pub const DEFAULT_REST_BASE_URL: &str = "https://api.lanyard.rest/v1";
