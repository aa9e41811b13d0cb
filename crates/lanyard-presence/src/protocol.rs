//! Lanyard socket wire format.
//!
//! Every frame is a JSON object with an opcode `op`, an optional event type
//! `t` and an optional payload `d`. The client only ever sends Initialize
//! (subscribe) and Heartbeat; it only acts on Hello and the two snapshot
//! events.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::PresenceDocument;

/// Opcodes.
pub mod op {
    pub const EVENT: u8 = 0;
    pub const HELLO: u8 = 1;
    pub const INITIALIZE: u8 = 2;
    pub const HEARTBEAT: u8 = 3;
}

/// Event types carried on `op = 0` frames.
pub mod events {
    pub const INIT_STATE: &str = "INIT_STATE";
    pub const PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Subscribe { user_id: String },
    Heartbeat,
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<SubscribePayload<'a>>,
}

#[derive(Serialize)]
struct SubscribePayload<'a> {
    subscribe_to_id: &'a str,
}

impl ClientMessage {
    pub fn to_json(&self) -> String {
        let envelope = match self {
            Self::Subscribe { user_id } => OutboundEnvelope {
                op: op::INITIALIZE,
                d: Some(SubscribePayload {
                    subscribe_to_id: user_id,
                }),
            },
            Self::Heartbeat => OutboundEnvelope {
                op: op::HEARTBEAT,
                d: None,
            },
        };
        // Plain structs of integers and strings cannot fail to serialize.
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Initial,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Hello { heartbeat_interval: Duration },
    Snapshot {
        kind: SnapshotKind,
        document: PresenceDocument,
    },
    /// Well-formed but irrelevant to this client.
    Ignored { op: Option<u64>, event: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame json: {0}")]
    Json(#[source] serde_json::Error),

    #[error("hello frame without a usable heartbeat_interval")]
    BadHello,

    #[error("{event} payload is not a presence document: {source}")]
    BadDocument {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    op: Option<u64>,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: serde_json::Value,
}

#[derive(Deserialize)]
struct HelloPayload {
    heartbeat_interval: u64,
}

/// Classify one inbound text frame.
pub fn decode(text: &str) -> Result<ServerMessage, FrameError> {
    let raw: RawFrame = serde_json::from_str(text).map_err(FrameError::Json)?;

    let snapshot = match raw.t.as_deref() {
        Some(events::INIT_STATE) => Some((SnapshotKind::Initial, events::INIT_STATE)),
        Some(events::PRESENCE_UPDATE) => Some((SnapshotKind::Update, events::PRESENCE_UPDATE)),
        _ => None,
    };
    if let Some((kind, event)) = snapshot {
        let document = serde_json::from_value(raw.d)
            .map_err(|source| FrameError::BadDocument { event, source })?;
        return Ok(ServerMessage::Snapshot { kind, document });
    }

    if raw.op == Some(u64::from(op::HELLO)) {
        let hello: HelloPayload =
            serde_json::from_value(raw.d).map_err(|_| FrameError::BadHello)?;
        if hello.heartbeat_interval == 0 {
            return Err(FrameError::BadHello);
        }
        return Ok(ServerMessage::Hello {
            heartbeat_interval: Duration::from_millis(hello.heartbeat_interval),
        });
    }

    Ok(ServerMessage::Ignored {
        op: raw.op,
        event: raw.t,
    })
}
