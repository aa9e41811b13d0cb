//! Presence document types as sent by Lanyard.

mod activity;
pub mod display;
mod document;

pub use activity::{Activity, ActivityAssets, ActivityKind, Emoji, Timestamps};
pub use document::{
    AvatarDecoration, DiscordStatus, DiscordUser, PresenceDocument, Spotify, SpotifyTimestamps,
};
