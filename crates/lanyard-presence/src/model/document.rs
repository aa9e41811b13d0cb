//! The presence document and its user/music records.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::{Activity, ActivityKind};
use super::display;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Complete presence snapshot for one user.
///
/// Every `INIT_STATE` / `PRESENCE_UPDATE` frame carries a whole document;
/// the link swaps it in as a unit and never patches individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceDocument {
    pub discord_status: DiscordStatus,
    /// In server order.
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub spotify: Option<Spotify>,
    #[serde(default)]
    pub discord_user: Option<DiscordUser>,
    #[serde(default)]
    pub listening_to_spotify: bool,
    #[serde(default)]
    pub active_on_discord_desktop: bool,
    #[serde(default)]
    pub active_on_discord_mobile: bool,
    #[serde(default)]
    pub active_on_discord_web: bool,
    /// Lanyard KV store entries.
    #[serde(default)]
    pub kv: HashMap<String, String>,
}

impl PresenceDocument {
    /// Activities of one kind, preserving server order.
    pub fn activities_of(&self, kind: ActivityKind) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(move |a| a.kind == kind)
    }

    /// The activity worth showing as "now doing": the first one that is
    /// neither music nor a custom status.
    pub fn primary_activity(&self) -> Option<&Activity> {
        self.activities
            .iter()
            .find(|a| !matches!(a.kind, ActivityKind::Listening | ActivityKind::Custom))
    }

    /// Text of the user's custom status, if set.
    pub fn custom_status(&self) -> Option<&str> {
        self.activities_of(ActivityKind::Custom)
            .next()
            .and_then(|a| a.state.as_deref())
    }

    /// Music session, only while Lanyard reports the user as listening.
    pub fn music(&self) -> Option<&Spotify> {
        if self.listening_to_spotify {
            self.spotify.as_ref()
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscordStatus {
    Online,
    Idle,
    Dnd,
    Offline,
}

impl DiscordStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Idle => "Idle",
            Self::Dnd => "Do Not Disturb",
            Self::Offline => "Offline",
        }
    }
}

impl std::fmt::Display for DiscordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Raw Discord user record as forwarded by Lanyard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub public_flags: u64,
    pub avatar_decoration_data: Option<AvatarDecoration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarDecoration {
    pub asset: String,
    #[serde(default)]
    pub sku_id: Option<String>,
}

impl DiscordUser {
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .map(|hash| display::avatar_url(&self.id, hash))
    }

    pub fn decoration_url(&self) -> Option<String> {
        self.avatar_decoration_data
            .as_ref()
            .map(|d| display::decoration_url(&d.asset))
    }
}

// ---------------------------------------------------------------------------
// Music
// ---------------------------------------------------------------------------

/// Spotify listening session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spotify {
    /// `None` for local files.
    #[serde(default)]
    pub track_id: Option<String>,
    pub timestamps: SpotifyTimestamps,
    pub song: String,
    pub artist: String,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub album: String,
}

/// Track start/end in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyTimestamps {
    pub start: i64,
    pub end: i64,
}

impl Spotify {
    pub fn duration(&self) -> Duration {
        let ms = self.timestamps.end.saturating_sub(self.timestamps.start);
        Duration::from_millis(u64::try_from(ms).unwrap_or(0))
    }

    /// Playback position as a fraction in `[0, 1]`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let total = self.timestamps.end.saturating_sub(self.timestamps.start);
        if total <= 0 {
            return 0.0;
        }
        let played = now.timestamp_millis().saturating_sub(self.timestamps.start);
        (played as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn track_url(&self) -> Option<String> {
        self.track_id
            .as_deref()
            .map(|id| format!("https://open.spotify.com/track/{id}"))
    }
}
