pub mod endpoints;
pub mod errors;

pub use endpoints::{DEFAULT_ENDPOINT, DEFAULT_REST_BASE_URL};
pub use errors::{ConfigError, LanyardError};

pub type Result<T> = std::result::Result<T, LanyardError>;
