//! Errors surfaced by the presence crate.
//!
//! None of these reach consumers of a running [`crate::PresenceLink`]; the
//! link recovers from every transport failure itself. They are returned by
//! [`crate::Connector`] implementations and by the one-shot REST lookup.

use lanyard_common::LanyardError;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("connection timed out after {0} ms")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lanyard api error {code}: {message}")]
    Api { code: String, message: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<PresenceError> for LanyardError {
    fn from(err: PresenceError) -> Self {
        match err {
            PresenceError::Timeout(_) | PresenceError::Connect(_) | PresenceError::Http(_) => {
                LanyardError::Network(err.to_string())
            }
            PresenceError::Api { .. } | PresenceError::Decode(_) => {
                LanyardError::Presence(err.to_string())
            }
        }
    }
}
