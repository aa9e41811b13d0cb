//! The presence link: socket lifecycle, frame dispatch and reconnects.
//!
//! [`PresenceLink`] is a handle; the work happens in a driver task that
//! owns the connection session, the heartbeat and the presence document.
//! Socket events, timer firings and shutdown requests all arrive on one
//! mailbox, so they are handled strictly one at a time.

mod backoff;
mod client;
mod driver;
mod types;

#[cfg(test)]
mod tests;

pub use backoff::ReconnectPolicy;
pub use client::PresenceLink;
pub use types::{LinkConfig, LinkState, DEFAULT_ENDPOINT};
