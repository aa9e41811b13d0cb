//! Helpers for turning presence data into displayable strings and CDN URLs.

use std::time::Duration;

const DISCORD_CDN: &str = "https://cdn.discordapp.com";
const DISCORD_MEDIA_PROXY: &str = "https://media.discordapp.net";

/// Resolve an activity asset key to an image URL.
///
/// `mp:` keys point at Discord's media proxy; anything else is an
/// application asset id. Returns `None` without an application id.
pub fn asset_url(application_id: Option<&str>, asset: &str) -> Option<String> {
    let app = application_id?;
    if let Some(path) = asset.strip_prefix("mp:") {
        return Some(format!("{DISCORD_MEDIA_PROXY}/{path}"));
    }
    Some(format!("{DISCORD_CDN}/app-assets/{app}/{asset}.png"))
}

/// Avatar URL; animated hashes (`a_` prefix) resolve to a gif.
pub fn avatar_url(user_id: &str, hash: &str) -> String {
    let ext = if hash.starts_with("a_") { "gif" } else { "png" };
    format!("{DISCORD_CDN}/avatars/{user_id}/{hash}.{ext}?size=512")
}

pub fn decoration_url(asset: &str) -> String {
    format!("{DISCORD_CDN}/avatar-decoration-presets/{asset}.png?size=512")
}

/// `mm:ss`, or `h:mm:ss` once an hour has passed.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_proxy_asset() {
        assert_eq!(
            asset_url(Some("1"), "mp:attachments/1/2/a.png").unwrap(),
            "https://media.discordapp.net/attachments/1/2/a.png"
        );
    }

    #[test]
    fn application_asset() {
        assert_eq!(
            asset_url(Some("42"), "999").unwrap(),
            "https://cdn.discordapp.com/app-assets/42/999.png"
        );
        assert!(asset_url(None, "999").is_none());
    }

    #[test]
    fn static_avatar_is_png() {
        assert_eq!(
            avatar_url("7", "abc"),
            "https://cdn.discordapp.com/avatars/7/abc.png?size=512"
        );
    }

    #[test]
    fn format_minutes_and_hours() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(3599)), "59:59");
        assert_eq!(format_elapsed(Duration::from_secs(3600 + 62)), "1:01:02");
    }
}
