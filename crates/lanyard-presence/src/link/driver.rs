//! Driver task: the single owner of the connection session, the heartbeat
//! and the presence document.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::PresenceError;
use crate::heartbeat::HeartbeatTimer;
use crate::model::PresenceDocument;
use crate::protocol::{self, ClientMessage, FrameError, ServerMessage};
use crate::timer::{Reaper, TimerGauge};
use crate::transport::{CloseInfo, Connector, OutboundFrame, TransportEvent};

use super::backoff::Backoff;
use super::types::{LinkConfig, LinkState};

pub(crate) type DocumentSender = watch::Sender<Option<Arc<PresenceDocument>>>;

/// Everything the driver reacts to.
#[derive(Debug)]
pub(crate) enum LinkMessage {
    /// The socket for `session` is open.
    Opened {
        session: u64,
        outbound: mpsc::Sender<OutboundFrame>,
    },
    ConnectFailed {
        session: u64,
        error: PresenceError,
    },
    Inbound {
        session: u64,
        event: TransportEvent,
    },
    ReconnectDue {
        ticket: u64,
    },
    Shutdown {
        done: Option<oneshot::Sender<()>>,
    },
}

/// One physical socket's lifetime.
#[derive(Debug)]
struct Session {
    id: u64,
    attempt: u32,
    /// Connects, then forwards transport events into the mailbox.
    task: JoinHandle<()>,
    /// Set once open.
    outbound: Option<mpsc::Sender<OutboundFrame>>,
    heartbeat_interval: Option<Duration>,
}

#[derive(Debug)]
struct PendingReconnect {
    ticket: u64,
    task: JoinHandle<()>,
}

pub(crate) struct LinkDriver {
    config: LinkConfig,
    connector: Arc<dyn Connector>,
    mailbox: mpsc::Receiver<LinkMessage>,
    /// Handed to session and timer tasks. Weak so that only the handles
    /// keep the mailbox open.
    mailbox_tx: mpsc::WeakSender<LinkMessage>,
    document: DocumentSender,
    state: watch::Sender<LinkState>,
    heartbeat: HeartbeatTimer,
    backoff: Backoff,
    gauge: TimerGauge,
    reaper: Reaper,
    session: Option<Session>,
    reconnect: Option<PendingReconnect>,
    next_session: u64,
    next_ticket: u64,
}

impl LinkDriver {
    pub(crate) fn new(
        config: LinkConfig,
        connector: Arc<dyn Connector>,
        mailbox: mpsc::Receiver<LinkMessage>,
        mailbox_tx: mpsc::WeakSender<LinkMessage>,
        document: DocumentSender,
        state: watch::Sender<LinkState>,
        gauge: TimerGauge,
    ) -> Self {
        let backoff = Backoff::new(config.reconnect.clone());
        Self {
            config,
            connector,
            mailbox,
            mailbox_tx,
            document,
            state,
            heartbeat: HeartbeatTimer::new(gauge.clone()),
            backoff,
            gauge,
            reaper: Reaper::default(),
            session: None,
            reconnect: None,
            next_session: 0,
            next_ticket: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        self.connect();
        while let Some(msg) = self.mailbox.recv().await {
            if !self.handle(msg).await {
                return;
            }
        }
        // Every handle dropped without an explicit shutdown.
        self.close().await;
    }

    /// Process one message. Returns `false` once the link is closed.
    pub(crate) async fn handle(&mut self, msg: LinkMessage) -> bool {
        match msg {
            LinkMessage::Opened { session, outbound } => self.on_open(session, outbound),
            LinkMessage::ConnectFailed { session, error } => {
                self.on_connect_failed(session, &error);
            }
            LinkMessage::Inbound {
                session,
                event: TransportEvent::Text(text),
            } => self.on_frame(session, &text),
            LinkMessage::Inbound {
                session,
                event: TransportEvent::Closed(close),
            } => self.on_closed(session, close),
            LinkMessage::ReconnectDue { ticket } => self.on_reconnect_due(ticket),
            LinkMessage::Shutdown { done } => {
                self.close().await;
                if let Some(done) = done {
                    let _ = done.send(());
                }
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Connecting
    // -----------------------------------------------------------------------

    pub(crate) fn connect(&mut self) {
        // A new attempt always supersedes whatever socket came before.
        self.drop_session();

        if self.mailbox_tx.strong_count() == 0 {
            debug!("link handle gone, not connecting");
            return;
        }

        self.next_session += 1;
        let id = self.next_session;
        let attempt = self.backoff.attempt();
        info!(
            session = id,
            attempt,
            endpoint = %self.config.endpoint,
            "connecting to presence socket"
        );
        self.state.send_replace(LinkState::Connecting { attempt });

        let task = tokio::spawn(session_task(
            id,
            Arc::clone(&self.connector),
            self.config.endpoint.clone(),
            self.mailbox_tx.clone(),
        ));
        self.session = Some(Session {
            id,
            attempt,
            task,
            outbound: None,
            heartbeat_interval: None,
        });
    }

    fn on_open(&mut self, id: u64, outbound: mpsc::Sender<OutboundFrame>) {
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            // Dropping `outbound` closes the superseded socket.
            debug!(session = id, "ignoring open from superseded socket");
            return;
        };

        let subscribe = ClientMessage::Subscribe {
            user_id: self.config.user_id.clone(),
        };
        if let Err(e) = outbound.try_send(OutboundFrame::Text(subscribe.to_json())) {
            // A dead socket reports its own close; nothing else to do here.
            warn!(session = id, error = %e, "failed to queue subscribe frame");
        }
        session.outbound = Some(outbound);
        info!(
            session = id,
            attempt = session.attempt,
            user_id = %self.config.user_id,
            "socket open, subscribe sent"
        );
        self.state.send_replace(LinkState::AwaitingHello);
    }

    fn on_connect_failed(&mut self, id: u64, error: &PresenceError) {
        if !self.is_current(id) {
            debug!(session = id, "ignoring connect failure from superseded attempt");
            return;
        }
        warn!(session = id, error = %error, "failed to connect to presence socket");
        self.drop_session();
        self.schedule_reconnect(CloseInfo::abnormal(error.to_string()));
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    fn on_frame(&mut self, id: u64, text: &str) {
        if !self.is_current(id) {
            trace!(session = id, "dropping frame from superseded socket");
            return;
        }

        match protocol::decode(text) {
            Ok(ServerMessage::Hello { heartbeat_interval }) => self.on_hello(heartbeat_interval),
            Ok(ServerMessage::Snapshot { kind, document }) => {
                debug!(
                    session = id,
                    ?kind,
                    status = %document.discord_status,
                    activities = document.activities.len(),
                    "presence snapshot"
                );
                self.document.send_replace(Some(Arc::new(document)));
            }
            Ok(ServerMessage::Ignored { op, event }) => {
                debug!(session = id, ?op, ?event, "ignoring frame");
            }
            Err(e @ FrameError::BadDocument { .. }) => {
                warn!(session = id, error = %e, "dropping undecodable snapshot");
            }
            Err(e) => debug!(session = id, error = %e, "dropping malformed frame"),
        }
    }

    fn on_hello(&mut self, interval: Duration) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(outbound) = session.outbound.as_ref() else {
            return;
        };

        self.heartbeat.arm(outbound, interval);
        session.heartbeat_interval = Some(interval);
        self.backoff.reset();
        info!(
            session = session.id,
            heartbeat_ms = interval.as_millis() as u64,
            "subscribed"
        );
        self.state.send_replace(LinkState::Subscribed {
            heartbeat_interval: interval,
        });
    }

    // -----------------------------------------------------------------------
    // Failure and reconnect
    // -----------------------------------------------------------------------

    fn on_closed(&mut self, id: u64, close: CloseInfo) {
        if !self.is_current(id) {
            debug!(session = id, "ignoring close from superseded socket");
            return;
        }
        let heartbeat = self
            .session
            .as_ref()
            .and_then(|s| s.heartbeat_interval)
            .map(|d| d.as_millis() as u64);
        warn!(session = id, close = %close, ?heartbeat, "presence socket closed");
        self.drop_session();
        self.schedule_reconnect(close);
    }

    fn schedule_reconnect(&mut self, last_close: CloseInfo) {
        self.cancel_reconnect();

        if self.mailbox_tx.strong_count() == 0 {
            debug!("link handle gone, not reconnecting");
            return;
        }

        let delay = self.backoff.next_delay();
        let attempt = self.backoff.attempt();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let guard = self.gauge.guard();
        let mailbox = self.mailbox_tx.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            deliver(&mailbox, LinkMessage::ReconnectDue { ticket }).await;
        });
        self.reconnect = Some(PendingReconnect { ticket, task });

        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.state.send_replace(LinkState::Reconnecting {
            attempt,
            delay,
            last_close: Some(last_close),
        });
    }

    fn on_reconnect_due(&mut self, ticket: u64) {
        match self.reconnect.take() {
            Some(pending) if pending.ticket == ticket => {
                self.reaper.retire(pending.task);
                self.connect();
            }
            other => {
                self.reconnect = other;
                debug!(ticket, "ignoring stale reconnect timer");
            }
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(pending) = self.reconnect.take() {
            debug!(ticket = pending.ticket, "pending reconnect cancelled");
            self.reaper.retire(pending.task);
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    fn is_current(&self, id: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == id)
    }

    /// Disarm the heartbeat, then let go of the socket.
    fn drop_session(&mut self) {
        self.heartbeat.disarm();
        if let Some(session) = self.session.take() {
            session.task.abort();
            if let Some(outbound) = session.outbound {
                let _ = outbound.try_send(OutboundFrame::Close);
            }
            trace!(session = session.id, "session discarded");
        }
    }

    async fn close(&mut self) {
        self.heartbeat.shutdown().await;
        self.cancel_reconnect();
        self.drop_session();
        self.reaper.drain().await;
        self.state.send_replace(LinkState::Closed);
        info!("presence link closed");
    }

    #[cfg(test)]
    pub(crate) fn has_pending_reconnect(&self) -> bool {
        self.reconnect.is_some()
    }
}

/// Post to the driver if any handle still exists.
async fn deliver(mailbox: &mpsc::WeakSender<LinkMessage>, msg: LinkMessage) -> bool {
    match mailbox.upgrade() {
        Some(tx) => tx.send(msg).await.is_ok(),
        None => false,
    }
}

/// Connect, report the result, then forward transport events tagged with
/// the session id until the transport ends.
async fn session_task(
    id: u64,
    connector: Arc<dyn Connector>,
    endpoint: String,
    mailbox: mpsc::WeakSender<LinkMessage>,
) {
    let transport = match connector.connect(&endpoint).await {
        Ok(transport) => transport,
        Err(error) => {
            deliver(&mailbox, LinkMessage::ConnectFailed { session: id, error }).await;
            return;
        }
    };

    let mut inbound = transport.inbound;
    let opened = LinkMessage::Opened {
        session: id,
        outbound: transport.outbound,
    };
    if !deliver(&mailbox, opened).await {
        return;
    }

    while let Some(event) = inbound.recv().await {
        let terminal = matches!(event, TransportEvent::Closed(_));
        let forwarded = deliver(&mailbox, LinkMessage::Inbound { session: id, event }).await;
        if !forwarded || terminal {
            return;
        }
    }

    let closed = TransportEvent::Closed(CloseInfo::abnormal("transport dropped"));
    deliver(&mailbox, LinkMessage::Inbound { session: id, event: closed }).await;
}
