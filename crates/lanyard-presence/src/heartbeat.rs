//! Server-paced liveness pulses.
//!
//! Lanyard drops subscribers that stay silent longer than the interval it
//! announced in Hello. The [`HeartbeatTimer`] sends `{"op":3}` on that
//! period for as long as the transport it was armed for stays open.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::protocol::ClientMessage;
use crate::timer::{Reaper, TimerGauge, TimerGuard};
use crate::transport::OutboundFrame;

/// One repeating pulse schedule. At most one is active at a time.
#[derive(Debug)]
pub struct HeartbeatTimer {
    task: Option<JoinHandle<()>>,
    period: Option<Duration>,
    gauge: TimerGauge,
    reaper: Reaper,
}

impl HeartbeatTimer {
    pub fn new(gauge: TimerGauge) -> Self {
        Self {
            task: None,
            period: None,
            gauge,
            reaper: Reaper::default(),
        }
    }

    /// Start pulsing on `transport` every `period`, replacing any previous
    /// schedule. The first pulse goes out one full period after arming.
    ///
    /// Only a weak handle to the transport is kept, so the timer never keeps
    /// a socket alive.
    pub fn arm(&mut self, transport: &mpsc::Sender<OutboundFrame>, period: Duration) {
        self.disarm();
        let guard = self.gauge.guard();
        self.task = Some(tokio::spawn(pulse_loop(
            transport.downgrade(),
            period,
            guard,
        )));
        self.period = Some(period);
        debug!(period_ms = period.as_millis() as u64, "heartbeat armed");
    }

    /// Cancel the schedule. No-op when not armed.
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            self.reaper.retire(task);
            debug!("heartbeat disarmed");
        }
        self.period = None;
    }

    /// Disarm and wait until every pulse task this timer ever spawned is gone.
    pub async fn shutdown(&mut self) {
        self.disarm();
        self.reaper.drain().await;
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn pulse_loop(
    transport: mpsc::WeakSender<OutboundFrame>,
    period: Duration,
    _guard: TimerGuard,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let pulse = ClientMessage::Heartbeat.to_json();

    loop {
        ticker.tick().await;

        let Some(tx) = transport.upgrade() else {
            debug!("transport gone, heartbeat stopping");
            return;
        };
        if tx.is_closed() {
            debug!("transport closed, heartbeat stopping");
            return;
        }
        match tx.try_send(OutboundFrame::Text(pulse.clone())) {
            Ok(()) => trace!("heartbeat sent"),
            Err(TrySendError::Full(_)) => warn!("outbound queue full, heartbeat skipped"),
            Err(TrySendError::Closed(_)) => return,
        }
    }
}
