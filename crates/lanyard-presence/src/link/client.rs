//! Public handle to a running presence link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::model::PresenceDocument;
use crate::timer::TimerGauge;
use crate::transport::{Connector, WsConnector};

use super::driver::{LinkDriver, LinkMessage};
use super::types::{LinkConfig, LinkState};

const MAILBOX_CAPACITY: usize = 64;

/// Live subscription to one user's presence.
///
/// Connecting starts a background driver that keeps the link up until
/// [`PresenceLink::shutdown`] is awaited or the handle is dropped.
#[derive(Debug)]
pub struct PresenceLink {
    commands: mpsc::Sender<LinkMessage>,
    document: watch::Receiver<Option<Arc<PresenceDocument>>>,
    state: watch::Receiver<LinkState>,
    gauge: TimerGauge,
}

impl PresenceLink {
    /// Connect over a real WebSocket. Must be called inside a tokio runtime.
    pub fn connect(config: LinkConfig) -> Self {
        let connector = WsConnector::new(config.connect_timeout);
        Self::with_connector(config, connector)
    }

    /// Connect through a caller-supplied transport.
    pub fn with_connector(config: LinkConfig, connector: impl Connector) -> Self {
        let (commands, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let (document_tx, document) = watch::channel(None);
        let (state_tx, state) = watch::channel(LinkState::Disconnected);
        let gauge = TimerGauge::new();

        let driver = LinkDriver::new(
            config,
            Arc::new(connector),
            mailbox,
            commands.downgrade(),
            document_tx,
            state_tx,
            gauge.clone(),
        );
        tokio::spawn(driver.run());

        Self {
            commands,
            document,
            state,
            gauge,
        }
    }

    /// The most recent presence document, if any snapshot has arrived.
    pub fn snapshot(&self) -> Option<Arc<PresenceDocument>> {
        self.document.borrow().clone()
    }

    /// True once at least one snapshot has been received.
    pub fn is_ready(&self) -> bool {
        self.document.borrow().is_some()
    }

    /// A receiver that wakes on every document replacement.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PresenceDocument>>> {
        self.document.clone()
    }

    pub fn state(&self) -> LinkState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Timer tasks (heartbeat, pending reconnect) still alive on the runtime.
    pub fn pending_timers(&self) -> usize {
        self.gauge.live()
    }

    /// Shared gauge; stays readable after the link is shut down.
    pub fn timer_gauge(&self) -> TimerGauge {
        self.gauge.clone()
    }

    /// Stop the link. Returns once the socket is released and every timer
    /// task is gone. Calling it when the driver already stopped is harmless.
    pub async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .commands
            .send(LinkMessage::Shutdown {
                done: Some(done_tx),
            })
            .await
            .is_err()
        {
            debug!("link driver already stopped");
            return;
        }
        let _ = done_rx.await;
    }

    /// Wait until the link reports [`LinkState::Subscribed`], or `timeout`.
    pub async fn wait_subscribed(&self, timeout: Duration) -> bool {
        let mut state = self.state.clone();
        tokio::time::timeout(timeout, state.wait_for(LinkState::is_subscribed))
            .await
            .is_ok_and(|r| r.is_ok())
    }
}

impl Drop for PresenceLink {
    fn drop(&mut self) {
        // After `shutdown` the driver is gone and this is a no-op.
        let _ = self.commands.try_send(LinkMessage::Shutdown { done: None });
    }
}
