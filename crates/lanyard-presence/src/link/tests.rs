use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::driver::{LinkDriver, LinkMessage};
use super::*;
use crate::error::PresenceError;
use crate::model::{DiscordStatus, PresenceDocument};
use crate::timer::TimerGauge;
use crate::transport::{CloseInfo, Connector, OutboundFrame, Transport, TransportEvent};

const USER_ID: &str = "94490510688792576";
const HELLO: &str = r#"{"op":1,"d":{"heartbeat_interval":30000}}"#;
const PULSE: &str = r#"{"op":3}"#;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Server side of one mock socket.
struct MockSocket {
    sent: mpsc::Receiver<OutboundFrame>,
    server: mpsc::Sender<TransportEvent>,
}

impl MockSocket {
    /// Everything the client has queued so far.
    fn drain(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn texts(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter_map(|f| match f {
                OutboundFrame::Text(t) => Some(t),
                OutboundFrame::Close => None,
            })
            .collect()
    }

    async fn push(&self, text: &str) {
        let _ = self.server.send(TransportEvent::Text(text.to_string())).await;
        settle().await;
    }

    async fn close(&self, code: u16) {
        let _ = self
            .server
            .send(TransportEvent::Closed(CloseInfo::new(code, "")))
            .await;
        settle().await;
    }
}

#[derive(Clone)]
struct MockConnector {
    sockets: mpsc::UnboundedSender<MockSocket>,
    refuse: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> Result<Transport, PresenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(PresenceError::Connect("connection refused".into()));
        }

        let (outbound, sent) = mpsc::channel(32);
        let (server, inbound) = mpsc::channel(32);
        let _ = self.sockets.send(MockSocket { sent, server });
        Ok(Transport { outbound, inbound })
    }
}

struct MockNet {
    sockets: mpsc::UnboundedReceiver<MockSocket>,
    refuse: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl MockNet {
    fn new() -> (Self, MockConnector) {
        let (tx, sockets) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicUsize::new(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = MockConnector {
            sockets: tx,
            refuse: Arc::clone(&refuse),
            attempts: Arc::clone(&attempts),
        };
        (
            Self {
                sockets,
                refuse,
                attempts,
            },
            connector,
        )
    }

    fn next_socket(&mut self) -> MockSocket {
        self.sockets.try_recv().expect("no socket was opened")
    }

    fn no_new_socket(&mut self) -> bool {
        self.sockets.try_recv().is_err()
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn config(policy: ReconnectPolicy) -> LinkConfig {
    LinkConfig {
        endpoint: "ws://lanyard.test/socket".into(),
        user_id: USER_ID.into(),
        connect_timeout: Duration::from_secs(10),
        reconnect: policy,
    }
}

async fn start(policy: ReconnectPolicy) -> (PresenceLink, MockNet) {
    let (net, connector) = MockNet::new();
    let link = PresenceLink::with_connector(config(policy), connector);
    settle().await;
    (link, net)
}

/// Start a link and complete the handshake on its first socket.
async fn start_subscribed() -> (PresenceLink, MockNet, MockSocket) {
    let (link, mut net) = start(ReconnectPolicy::fixed(Duration::from_secs(3))).await;
    let mut socket = net.next_socket();
    socket.push(HELLO).await;
    assert!(link.state().is_subscribed());
    socket.drain();
    (link, net, socket)
}

async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

async fn run_for(d: Duration) {
    tokio::time::sleep(d).await;
    settle().await;
}

fn snapshot_frame(event: &str, doc: &serde_json::Value) -> String {
    json!({ "op": 0, "t": event, "d": doc }).to_string()
}

fn doc_online() -> serde_json::Value {
    json!({
        "discord_status": "online",
        "listening_to_spotify": false,
        "activities": [
            { "type": 0, "name": "Visual Studio Code", "details": "Editing main.rs" }
        ],
        "kv": { "location": "Berlin" }
    })
}

fn doc_idle() -> serde_json::Value {
    json!({
        "discord_status": "idle",
        "listening_to_spotify": false,
        "activities": []
    })
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn subscribes_as_soon_as_socket_opens() {
    let (link, mut net) = start(ReconnectPolicy::default()).await;
    let mut socket = net.next_socket();

    let texts = socket.texts();
    assert_eq!(texts.len(), 1);
    let frame: serde_json::Value = serde_json::from_str(&texts[0]).unwrap();
    assert_eq!(frame, json!({ "op": 2, "d": { "subscribe_to_id": USER_ID } }));
    assert_eq!(link.state(), LinkState::AwaitingHello);
    assert!(!link.is_ready());
    assert_eq!(link.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn hello_starts_heartbeat_on_server_period() {
    let (link, mut net) = start(ReconnectPolicy::default()).await;
    let mut socket = net.next_socket();
    socket.drain();

    socket.push(HELLO).await;
    let armed_at = Instant::now();
    assert_eq!(
        link.state(),
        LinkState::Subscribed {
            heartbeat_interval: Duration::from_secs(30)
        }
    );
    assert_eq!(link.pending_timers(), 1);

    run_for(Duration::from_millis(29_999)).await;
    assert!(socket.texts().is_empty());

    run_for(Duration::from_millis(1)).await;
    assert_eq!(socket.texts(), vec![PULSE.to_string()]);
    assert_eq!(armed_at.elapsed(), Duration::from_secs(30));

    run_for(Duration::from_secs(60)).await;
    assert_eq!(socket.texts(), vec![PULSE.to_string(), PULSE.to_string()]);
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn snapshots_replace_whole_document() {
    let (link, _net, socket) = start_subscribed().await;
    let mut updates = link.subscribe();

    socket
        .push(&snapshot_frame("INIT_STATE", &doc_online()))
        .await;
    assert!(updates.has_changed().unwrap());
    let _ = updates.borrow_and_update();
    let first = link.snapshot().unwrap();
    assert_eq!(first.discord_status, DiscordStatus::Online);
    assert_eq!(first.activities.len(), 1);
    assert_eq!(first.kv.get("location").map(String::as_str), Some("Berlin"));

    socket
        .push(&snapshot_frame("PRESENCE_UPDATE", &doc_idle()))
        .await;
    assert!(updates.has_changed().unwrap());
    let second = link.snapshot().unwrap();
    let expected: PresenceDocument = serde_json::from_value(doc_idle()).unwrap();
    assert_eq!(*second, expected);
    // Nothing from the first document survives.
    assert!(second.activities.is_empty());
    assert!(second.kv.is_empty());
}

#[tokio::test(start_paused = true)]
async fn snapshot_before_hello_is_accepted() {
    let (link, mut net) = start(ReconnectPolicy::default()).await;
    let socket = net.next_socket();

    socket
        .push(&snapshot_frame("INIT_STATE", &doc_online()))
        .await;
    assert_eq!(link.state(), LinkState::AwaitingHello);
    assert!(link.is_ready());
}

#[tokio::test(start_paused = true)]
async fn bad_frames_are_dropped_without_disturbing_link() {
    let (link, mut net) = start(ReconnectPolicy::default()).await;
    let socket = net.next_socket();

    socket.push("not json at all").await;
    socket.push(r#"{"op":0,"t":"INIT_STATE","d":{"bogus":1}}"#).await;
    socket.push(r#"{"op":1,"d":{"heartbeat_interval":0}}"#).await;
    socket.push(r#"{"op":7,"d":{}}"#).await;
    socket.push(r#"{"op":0,"t":"SOMETHING_NEW","d":{}}"#).await;
    assert_eq!(link.state(), LinkState::AwaitingHello);
    assert!(link.snapshot().is_none());

    // The link is still listening on the same socket.
    socket.push(HELLO).await;
    assert!(link.state().is_subscribed());
    assert_eq!(net.attempts(), 1);
    assert!(net.no_new_socket());
}

#[tokio::test(start_paused = true)]
async fn bad_frames_after_snapshot_keep_document() {
    let (link, mut net, socket) = start_subscribed().await;
    let mut updates = link.subscribe();

    socket
        .push(&snapshot_frame("INIT_STATE", &doc_online()))
        .await;
    let _ = updates.borrow_and_update();
    let before = link.snapshot().unwrap();

    socket.push("{not json").await;
    socket
        .push(r#"{"op":0,"t":"PRESENCE_UPDATE","d":{"activities":"nope"}}"#)
        .await;
    socket.push(r#"{"op":0,"t":"PRESENCE_UPDATE","d":null}"#).await;
    socket.push(r#"{"op":0,"t":"SOMETHING_NEW","d":{}}"#).await;

    assert!(!updates.has_changed().unwrap());
    assert!(Arc::ptr_eq(&before, &link.snapshot().unwrap()));
    assert!(link.state().is_subscribed());
    assert_eq!(net.attempts(), 1);
    assert!(net.no_new_socket());

    // A good update still lands afterwards.
    socket
        .push(&snapshot_frame("PRESENCE_UPDATE", &doc_idle()))
        .await;
    assert!(updates.has_changed().unwrap());
    assert!(!Arc::ptr_eq(&before, &link.snapshot().unwrap()));
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn abnormal_close_reconnects_after_delay() {
    let (link, mut net, mut old) = start_subscribed().await;

    old.close(1006).await;
    let closed_at = Instant::now();
    assert_eq!(
        link.state(),
        LinkState::Reconnecting {
            attempt: 1,
            delay: Duration::from_secs(3),
            last_close: Some(CloseInfo::new(1006, "")),
        }
    );
    // Heartbeat gone, reconnect pending.
    assert_eq!(link.pending_timers(), 1);

    run_for(Duration::from_millis(2_999)).await;
    assert!(net.no_new_socket());
    assert_eq!(net.attempts(), 1);

    run_for(Duration::from_millis(1)).await;
    let mut fresh = net.next_socket();
    assert_eq!(closed_at.elapsed(), Duration::from_secs(3));
    assert_eq!(net.attempts(), 2);
    assert_eq!(link.state(), LinkState::AwaitingHello);
    assert_eq!(fresh.texts().len(), 1);

    // The old socket never sees another pulse.
    run_for(Duration::from_secs(90)).await;
    assert!(!old.texts().iter().any(|t| t == PULSE));
}

#[tokio::test(start_paused = true)]
async fn clean_close_is_also_retried() {
    let (link, mut net, socket) = start_subscribed().await;

    socket.close(1000).await;
    assert!(matches!(
        link.state(),
        LinkState::Reconnecting { attempt: 1, .. }
    ));

    run_for(Duration::from_secs(3)).await;
    let _fresh = net.next_socket();
    assert_eq!(net.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn closed_socket_gets_close_frame() {
    let (_link, _net, mut socket) = start_subscribed().await;

    socket.close(4004).await;
    let frames = socket.drain();
    assert!(frames.contains(&OutboundFrame::Close));
    assert!(!frames.contains(&OutboundFrame::Text(PULSE.to_string())));
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_on_failures_and_resets_after_handshake() {
    let policy = ReconnectPolicy {
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(60),
        multiplier: 2.0,
        jitter: 0.0,
    };
    let (mut net, connector) = MockNet::new();
    net.refuse.store(3, Ordering::SeqCst);
    let link = PresenceLink::with_connector(config(policy), connector);
    settle().await;

    let mut delays = Vec::new();
    for _ in 0..3 {
        match link.state() {
            LinkState::Reconnecting { delay, .. } => {
                delays.push(delay);
                run_for(delay).await;
            }
            other => panic!("expected reconnecting, got {other:?}"),
        }
    }
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert_eq!(net.attempts(), 4);
    assert_eq!(link.state(), LinkState::AwaitingHello);

    let socket = net.next_socket();
    socket.push(HELLO).await;
    socket.close(1006).await;
    assert_eq!(
        link.state(),
        LinkState::Reconnecting {
            attempt: 1,
            delay: Duration::from_secs(1),
            last_close: Some(CloseInfo::new(1006, "")),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn connect_failure_is_reported_as_last_close() {
    let (net, connector) = MockNet::new();
    net.refuse.store(1, Ordering::SeqCst);
    let link = PresenceLink::with_connector(
        config(ReconnectPolicy::fixed(Duration::from_secs(3))),
        connector,
    );
    settle().await;

    match link.state() {
        LinkState::Reconnecting {
            attempt,
            last_close: Some(close),
            ..
        } => {
            assert_eq!(attempt, 1);
            assert_eq!(close.code, None);
            assert!(close.reason.contains("connection refused"));
        }
        other => panic!("expected reconnecting, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn full_session_survives_abnormal_close() {
    let policy = ReconnectPolicy {
        jitter: 0.0,
        ..ReconnectPolicy::default()
    };
    let (link, mut net) = start(policy).await;

    let mut first = net.next_socket();
    assert_eq!(first.texts().len(), 1);
    first.push(HELLO).await;
    first
        .push(&snapshot_frame("INIT_STATE", &doc_online()))
        .await;
    assert_eq!(
        link.snapshot().map(|d| d.discord_status),
        Some(DiscordStatus::Online)
    );

    first.close(1006).await;
    assert_eq!(link.pending_timers(), 1);
    run_for(Duration::from_secs(3)).await;

    // Document survives the reconnect until a new snapshot replaces it.
    assert!(link.is_ready());
    let mut second = net.next_socket();
    let texts = second.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains(USER_ID));
    second.push(HELLO).await;
    assert!(link.state().is_subscribed());
    assert_eq!(link.pending_timers(), 1);

    run_for(Duration::from_secs(30)).await;
    assert_eq!(second.texts(), vec![PULSE.to_string()]);
    assert!(!first.texts().iter().any(|t| t == PULSE));

    link.shutdown().await;
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shutdown_while_subscribed_releases_everything() {
    let (link, mut net, mut socket) = start_subscribed().await;
    let gauge = link.timer_gauge();
    let state = link.watch_state();
    assert_eq!(gauge.live(), 1);

    link.shutdown().await;
    assert_eq!(gauge.live(), 0);
    assert_eq!(*state.borrow(), LinkState::Closed);

    run_for(Duration::from_secs(120)).await;
    assert_eq!(socket.drain(), vec![OutboundFrame::Close]);
    assert_eq!(net.attempts(), 1);
    assert!(net.no_new_socket());
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_reconnecting_cancels_retry() {
    let (link, mut net, socket) = start_subscribed().await;
    socket.close(1006).await;
    let gauge = link.timer_gauge();
    assert_eq!(gauge.live(), 1);

    link.shutdown().await;
    assert_eq!(gauge.live(), 0);

    run_for(Duration::from_secs(30)).await;
    assert_eq!(net.attempts(), 1);
    assert!(net.no_new_socket());
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_open_leaves_nothing_running() {
    let (link, net) = start(ReconnectPolicy::default()).await;
    let gauge = link.timer_gauge();

    link.shutdown().await;
    assert_eq!(gauge.live(), 0);
    run_for(Duration::from_secs(30)).await;
    assert_eq!(net.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_link() {
    let (link, mut net, mut socket) = start_subscribed().await;
    let gauge = link.timer_gauge();
    let state = link.watch_state();

    drop(link);
    settle().await;
    assert_eq!(gauge.live(), 0);
    assert_eq!(*state.borrow(), LinkState::Closed);

    run_for(Duration::from_secs(120)).await;
    assert!(socket.texts().is_empty());
    assert!(net.no_new_socket());
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Connector whose attempts never resolve; the test feeds the driver by hand.
struct StalledConnector;

#[async_trait]
impl Connector for StalledConnector {
    async fn connect(&self, _url: &str) -> Result<Transport, PresenceError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn driver_ignores_superseded_sessions() {
    let (commands, mailbox) = mpsc::channel(8);
    let (document_tx, document) = watch::channel(None);
    let (state_tx, state) = watch::channel(LinkState::Disconnected);
    let gauge = TimerGauge::new();
    let mut driver = LinkDriver::new(
        config(ReconnectPolicy::fixed(Duration::from_secs(3))),
        Arc::new(StalledConnector),
        mailbox,
        commands.downgrade(),
        document_tx,
        state_tx,
        gauge.clone(),
    );

    driver.connect();
    assert_eq!(*state.borrow(), LinkState::Connecting { attempt: 0 });

    let (out1, mut sent1) = mpsc::channel(8);
    assert!(driver.handle(LinkMessage::Opened { session: 1, outbound: out1 }).await);
    assert!(matches!(sent1.try_recv(), Ok(OutboundFrame::Text(_))));

    let close = || TransportEvent::Closed(CloseInfo::new(1006, ""));
    driver
        .handle(LinkMessage::Inbound { session: 1, event: close() })
        .await;
    settle().await;
    assert!(driver.has_pending_reconnect());
    assert_eq!(gauge.live(), 1);

    // A second close for the same socket schedules nothing new.
    driver
        .handle(LinkMessage::Inbound { session: 1, event: close() })
        .await;
    settle().await;
    assert_eq!(gauge.live(), 1);

    driver.handle(LinkMessage::ReconnectDue { ticket: 1 }).await;
    settle().await;
    assert!(!driver.has_pending_reconnect());
    assert_eq!(*state.borrow(), LinkState::Connecting { attempt: 1 });

    // Late events from session 1 are ignored.
    driver
        .handle(LinkMessage::Inbound {
            session: 1,
            event: TransportEvent::Text(HELLO.into()),
        })
        .await;
    driver
        .handle(LinkMessage::Inbound {
            session: 1,
            event: TransportEvent::Text(snapshot_frame("INIT_STATE", &doc_online())),
        })
        .await;
    driver
        .handle(LinkMessage::Inbound { session: 1, event: close() })
        .await;
    driver.handle(LinkMessage::ReconnectDue { ticket: 1 }).await;
    assert_eq!(*state.borrow(), LinkState::Connecting { attempt: 1 });
    assert!(document.borrow().is_none());
    assert!(!driver.has_pending_reconnect());

    let (stale_out, mut stale_sent) = mpsc::channel(8);
    driver
        .handle(LinkMessage::Opened {
            session: 1,
            outbound: stale_out,
        })
        .await;
    assert!(stale_sent.recv().await.is_none());

    assert!(!driver.handle(LinkMessage::Shutdown { done: None }).await);
    assert_eq!(gauge.live(), 0);
    assert_eq!(*state.borrow(), LinkState::Closed);
}

// ---------------------------------------------------------------------------
// Real socket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn websocket_round_trip() {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    async fn next_text<S>(ws: &mut S) -> String
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => panic!("socket ended early: {other:?}"),
            }
        }
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let subscribe = next_text(&mut ws).await;
        ws.send(Message::Text(
            r#"{"op":1,"d":{"heartbeat_interval":50}}"#.to_string().into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            snapshot_frame("INIT_STATE", &doc_online()).into(),
        ))
        .await
        .unwrap();
        let pulse = next_text(&mut ws).await;
        (subscribe, pulse)
    });

    let mut cfg = config(ReconnectPolicy::default());
    cfg.endpoint = format!("ws://{addr}");
    let link = PresenceLink::connect(cfg);
    let mut updates = link.subscribe();

    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(Option::is_some))
        .await
        .expect("no snapshot within 5s")
        .unwrap();
    assert!(link.wait_subscribed(Duration::from_secs(5)).await);
    assert_eq!(
        link.snapshot().unwrap().discord_status,
        DiscordStatus::Online
    );

    let (subscribe, pulse) = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not finish")
        .unwrap();
    let subscribe: serde_json::Value = serde_json::from_str(&subscribe).unwrap();
    assert_eq!(subscribe["d"]["subscribe_to_id"], USER_ID);
    assert_eq!(pulse, PULSE);

    let gauge = link.timer_gauge();
    link.shutdown().await;
    assert_eq!(gauge.live(), 0);
}
