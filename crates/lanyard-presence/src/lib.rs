//! Realtime presence mirror for a single Lanyard-tracked Discord user.
//!
//! [`PresenceLink`] keeps one WebSocket subscription alive: it sends the
//! subscribe frame on open, arms the [`HeartbeatTimer`] when the server says
//! hello, replaces the [`PresenceDocument`] on every snapshot and reconnects
//! with capped exponential backoff after any failure. Consumers only read
//! the latest snapshot.
//!
//! ```rust,no_run
//! use lanyard_presence::{LinkConfig, PresenceLink};
//!
//! # async fn run() {
//! let link = PresenceLink::connect(LinkConfig::new("94490510688792576"));
//! let mut updates = link.subscribe();
//! while updates.changed().await.is_ok() {
//!     if let Some(doc) = updates.borrow_and_update().clone() {
//!         println!("{:?}", doc.discord_status);
//!     }
//! }
//! link.shutdown().await;
//! # }
//! ```

pub mod error;
pub mod heartbeat;
pub mod link;
pub mod model;
pub mod protocol;
pub mod rest;
pub mod timer;
pub mod transport;

pub use error::PresenceError;
pub use heartbeat::HeartbeatTimer;
pub use link::{LinkConfig, LinkState, PresenceLink, ReconnectPolicy};
pub use model::{
    Activity, ActivityKind, DiscordStatus, DiscordUser, PresenceDocument, Spotify, Timestamps,
};
pub use rest::RestClient;
pub use timer::TimerGauge;
pub use transport::{
    CloseInfo, Connector, OutboundFrame, Transport, TransportEvent, WsConnector,
};
