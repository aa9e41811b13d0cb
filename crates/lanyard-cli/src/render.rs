//! Terminal output for `watch` and `fetch`.

use chrono::{DateTime, Utc};
use lanyard_presence::model::display::format_elapsed;
use lanyard_presence::{Activity, ActivityKind, LinkState, PresenceDocument};
use serde_json::json;

const SEPARATOR: &str = " | ";

fn verb(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Playing => "Playing",
        ActivityKind::Streaming => "Streaming",
        ActivityKind::Listening => "Listening to",
        ActivityKind::Watching => "Watching",
        ActivityKind::Competing => "Competing in",
        ActivityKind::Custom | ActivityKind::Other(_) => "",
    }
}

fn activity_part(activity: &Activity, now: DateTime<Utc>) -> String {
    let mut out = match verb(activity.kind) {
        "" => activity.name.clone(),
        verb => format!("{verb} {}", activity.name),
    };
    if let Some(details) = activity.details.as_deref() {
        out.push_str(&format!(" ({details})"));
    }
    if let Some(elapsed) = activity.elapsed(now) {
        out.push_str(&format!(" {}", format_elapsed(elapsed)));
    }
    out
}

/// One-line summary of a document.
pub fn document_line(doc: &PresenceDocument, now: DateTime<Utc>) -> String {
    let mut parts = Vec::new();

    let status = match doc.discord_user.as_ref() {
        Some(user) => format!("{} is {}", user.display_name(), doc.discord_status),
        None => doc.discord_status.to_string(),
    };
    parts.push(status);

    if let Some(text) = doc.custom_status() {
        parts.push(format!("\"{text}\""));
    }
    if let Some(activity) = doc.primary_activity() {
        parts.push(activity_part(activity, now));
    }
    if let Some(music) = doc.music() {
        let position = now.timestamp_millis().saturating_sub(music.timestamps.start);
        let played = std::time::Duration::from_millis(u64::try_from(position).unwrap_or(0))
            .min(music.duration());
        parts.push(format!(
            "{} - {} {}/{}",
            music.song,
            music.artist,
            format_elapsed(played),
            format_elapsed(music.duration())
        ));
    }

    parts.join(SEPARATOR)
}

pub fn document_json(doc: &PresenceDocument) -> String {
    serde_json::to_string(doc).unwrap_or_else(|e| {
        json!({ "error": format!("failed to serialize document: {e}") }).to_string()
    })
}

pub fn state_line(state: &LinkState) -> String {
    match state {
        LinkState::Disconnected => "[link] disconnected".into(),
        LinkState::Connecting { attempt: 0 } => "[link] connecting".into(),
        LinkState::Connecting { attempt } => {
            format!("[link] connecting (attempt {})", attempt + 1)
        }
        LinkState::AwaitingHello => "[link] waiting for hello".into(),
        LinkState::Subscribed { heartbeat_interval } => format!(
            "[link] subscribed (heartbeat every {}s)",
            heartbeat_interval.as_secs_f64()
        ),
        LinkState::Reconnecting {
            delay, last_close, ..
        } => match last_close {
            Some(close) => format!(
                "[link] {close}; reconnecting in {:.1}s",
                delay.as_secs_f64()
            ),
            None => format!("[link] reconnecting in {:.1}s", delay.as_secs_f64()),
        },
        LinkState::Closed => "[link] closed".into(),
    }
}

pub fn state_json(state: &LinkState) -> String {
    let value = match state {
        LinkState::Disconnected => json!({ "state": "disconnected" }),
        LinkState::Connecting { attempt } => json!({ "state": "connecting", "attempt": attempt }),
        LinkState::AwaitingHello => json!({ "state": "awaiting_hello" }),
        LinkState::Subscribed { heartbeat_interval } => json!({
            "state": "subscribed",
            "heartbeat_interval_ms": heartbeat_interval.as_millis() as u64,
        }),
        LinkState::Reconnecting {
            attempt,
            delay,
            last_close,
        } => json!({
            "state": "reconnecting",
            "attempt": attempt,
            "delay_ms": delay.as_millis() as u64,
            "close_code": last_close.as_ref().and_then(|c| c.code),
            "close_reason": last_close.as_ref().map(|c| c.reason.as_str()),
        }),
        LinkState::Closed => json!({ "state": "closed" }),
    };
    value.to_string()
}
