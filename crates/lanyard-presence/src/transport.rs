//! Socket abstraction used by the link.
//!
//! A [`Transport`] is a pair of queues: frames the link wants written, and
//! events the socket produced. [`WsConnector`] backs it with a real
//! WebSocket (reader and writer tasks over a split `tokio-tungstenite`
//! stream); tests back it with in-memory channels.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, trace, warn};

use crate::error::PresenceError;

const OUTBOUND_CAPACITY: usize = 32;
const INBOUND_CAPACITY: usize = 256;

/// Frame queued for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Send a close frame and stop writing.
    Close,
}

/// Something the socket reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    /// Terminal: nothing follows on this transport.
    Closed(CloseInfo),
}

/// Why a socket went away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, when the peer sent one.
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }

    /// Closed without a close frame (error, EOF, failed connect).
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: reason.into(),
        }
    }

    fn from_frame(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self::new(u16::from(frame.code), frame.reason.as_str()),
            None => Self::abnormal("closed without status"),
        }
    }
}

impl std::fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) if self.reason.is_empty() => write!(f, "code {code}"),
            Some(code) => write!(f, "code {code}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// An open socket, seen as two queues.
///
/// Dropping `outbound` (every strong sender) makes the writer close the
/// socket; `inbound` always ends with a [`TransportEvent::Closed`] or with
/// the channel closing.
#[derive(Debug)]
pub struct Transport {
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Opens transports to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Transport, PresenceError>;
}

// ---------------------------------------------------------------------------
// WebSocket connector
// ---------------------------------------------------------------------------

/// [`Connector`] over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Transport, PresenceError> {
        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);
        let (ws_stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
                .await
                .map_err(|_| PresenceError::Timeout(timeout_ms))?
                .map_err(|e| PresenceError::Connect(e.to_string()))?;

        let (ws_write, ws_read) = ws_stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        tokio::spawn(write_loop(ws_write, outbound_rx));
        tokio::spawn(read_loop(ws_read, inbound_tx));

        Ok(Transport {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

async fn write_loop<S>(mut sink: S, mut frames: mpsc::Receiver<OutboundFrame>)
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = frames.recv().await {
        match frame {
            OutboundFrame::Text(text) => {
                trace!(frame = %text, "ws send");
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    debug!(error = %e, "ws write failed");
                    break;
                }
            }
            OutboundFrame::Close => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}

async fn read_loop<S>(mut stream: S, events: mpsc::Sender<TransportEvent>)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let close = loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                let event = TransportEvent::Text(text.as_str().to_owned());
                if events.send(event).await.is_err() {
                    // Link no longer listening.
                    return;
                }
            }
            Some(Ok(WsMessage::Close(frame))) => break CloseInfo::from_frame(frame),
            Some(Ok(WsMessage::Binary(_))) => debug!("ignoring binary frame"),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "ws read error");
                break CloseInfo::abnormal(e.to_string());
            }
            None => break CloseInfo::abnormal("stream ended"),
        }
    };
    let _ = events.send(TransportEvent::Closed(close)).await;
}
