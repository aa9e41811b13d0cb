//! Discord activities, distinguished by their numeric `type`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::display;

/// Activity discriminant. Unknown values are kept as `Other` so a new
/// Discord activity type never invalidates a whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
    Custom,
    Competing,
    Other(u32),
}

impl From<u32> for ActivityKind {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Playing,
            1 => Self::Streaming,
            2 => Self::Listening,
            3 => Self::Watching,
            4 => Self::Custom,
            5 => Self::Competing,
            other => Self::Other(other),
        }
    }
}

impl From<ActivityKind> for u32 {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Playing => 0,
            ActivityKind::Streaming => 1,
            ActivityKind::Listening => 2,
            ActivityKind::Watching => 3,
            ActivityKind::Custom => 4,
            ActivityKind::Competing => 5,
            ActivityKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
    #[serde(default)]
    pub assets: Option<ActivityAssets>,
    #[serde(default)]
    pub application_id: Option<String>,
    /// Only present on custom statuses.
    #[serde(default)]
    pub emoji: Option<Emoji>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Activity {
    pub fn large_image_url(&self) -> Option<String> {
        self.asset_url(|a| a.large_image.as_deref())
    }

    pub fn small_image_url(&self) -> Option<String> {
        self.asset_url(|a| a.small_image.as_deref())
    }

    /// Time since the activity started, if it reports a start.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.timestamps.as_ref().and_then(|t| t.elapsed(now))
    }

    fn asset_url(&self, pick: impl Fn(&ActivityAssets) -> Option<&str>) -> Option<String> {
        let asset = self.assets.as_ref().and_then(pick)?;
        display::asset_url(self.application_id.as_deref(), asset)
    }
}

/// Start/end in unix milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamps {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl Timestamps {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.and_then(DateTime::from_timestamp_millis)
    }

    /// `None` without a start, or when the start lies in the future.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.start_time()?;
        (now - start).to_std().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityAssets {
    pub large_image: Option<String>,
    pub large_text: Option<String>,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emoji {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_round_trips_through_number() {
        for n in 0u32..=7 {
            let kind = ActivityKind::from(n);
            assert_eq!(u32::from(kind), n);
        }
        assert_eq!(ActivityKind::from(9), ActivityKind::Other(9));
    }

    #[test]
    fn unknown_kind_still_decodes() {
        let activity: Activity =
            serde_json::from_value(json!({ "type": 42, "name": "Hang Status" })).unwrap();
        assert_eq!(activity.kind, ActivityKind::Other(42));
    }

    #[test]
    fn kind_beyond_one_byte_still_decodes() {
        let activity: Activity =
            serde_json::from_value(json!({ "type": 300, "name": "Future Thing" })).unwrap();
        assert_eq!(activity.kind, ActivityKind::Other(300));
        assert_eq!(serde_json::to_value(&activity).unwrap()["type"], 300);
    }

    #[test]
    fn kind_serializes_as_number() {
        let activity: Activity =
            serde_json::from_value(json!({ "type": 3, "name": "YouTube" })).unwrap();
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["type"], 3);
    }

    #[test]
    fn asset_urls_resolve_through_application() {
        let activity: Activity = serde_json::from_value(json!({
            "type": 0,
            "name": "Visual Studio Code",
            "application_id": "383226320970055681",
            "assets": {
                "large_image": "565945350424821770",
                "small_image": "mp:external/abc/https/example.com/icon.png"
            }
        }))
        .unwrap();

        assert_eq!(
            activity.large_image_url().unwrap(),
            "https://cdn.discordapp.com/app-assets/383226320970055681/565945350424821770.png"
        );
        assert_eq!(
            activity.small_image_url().unwrap(),
            "https://media.discordapp.net/external/abc/https/example.com/icon.png"
        );
    }

    #[test]
    fn asset_urls_need_application_id() {
        let activity: Activity = serde_json::from_value(json!({
            "type": 0,
            "name": "Something",
            "assets": { "large_image": "123" }
        }))
        .unwrap();
        assert!(activity.large_image_url().is_none());
        assert!(activity.small_image_url().is_none());
    }

    #[test]
    fn elapsed_from_start() {
        let activity: Activity = serde_json::from_value(json!({
            "type": 0,
            "name": "Factorio",
            "timestamps": { "start": 1_700_000_000_000i64 }
        }))
        .unwrap();

        let now = DateTime::from_timestamp_millis(1_700_000_090_000).unwrap();
        assert_eq!(activity.elapsed(now), Some(Duration::from_secs(90)));

        let earlier = DateTime::from_timestamp_millis(1_600_000_000_000).unwrap();
        assert_eq!(activity.elapsed(earlier), None);
    }

    #[test]
    fn elapsed_without_timestamps_is_none() {
        let activity: Activity =
            serde_json::from_value(json!({ "type": 0, "name": "Factorio" })).unwrap();
        assert_eq!(activity.elapsed(Utc::now()), None);
    }

    #[test]
    fn custom_status_emoji() {
        let activity: Activity = serde_json::from_value(json!({
            "type": 4,
            "name": "Custom Status",
            "state": "brb",
            "emoji": { "name": "☕" }
        }))
        .unwrap();
        assert_eq!(activity.emoji.unwrap().name, "☕");
    }
}
