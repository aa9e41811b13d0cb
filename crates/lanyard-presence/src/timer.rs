//! Live-timer accounting.
//!
//! Every timer task spawned by the link (heartbeat schedule, pending
//! reconnect) holds a [`TimerGuard`] inside its future. The guard is dropped
//! when the task finishes or is cancelled, so [`TimerGauge::live`] counts
//! timer tasks that still exist on the runtime, not timers the link merely
//! believes it scheduled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct TimerGauge {
    live: Arc<AtomicUsize>,
}

impl TimerGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer; keep the guard inside the timer's task.
    pub fn guard(&self) -> TimerGuard {
        self.live.fetch_add(1, Ordering::SeqCst);
        TimerGuard {
            live: Arc::clone(&self.live),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct TimerGuard {
    live: Arc<AtomicUsize>,
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cancelled timer tasks that may not have been dropped by the runtime yet.
///
/// `abort()` only requests cancellation; [`Reaper::drain`] waits until every
/// retired task is actually gone.
#[derive(Debug, Default)]
pub(crate) struct Reaper {
    retired: Vec<JoinHandle<()>>,
}

impl Reaper {
    pub(crate) fn retire(&mut self, task: JoinHandle<()>) {
        task.abort();
        self.retired.retain(|t| !t.is_finished());
        self.retired.push(task);
    }

    pub(crate) async fn drain(&mut self) {
        for task in self.retired.drain(..) {
            let _ = task.await;
        }
    }
}
