//! Per-connection liveness timer.
//!
//! After `ping_interval` of inbound silence the timer asks for a PING; if the
//! silence then lasts another `ping_timeout` it reports a timeout. Any inbound
//! line restarts the cycle. Signals carry the [`ConnectionId`] they were armed
//! for so a consumer can drop signals from a connection that has been
//! replaced. The background task is aborted when the timer is stopped or
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::trace;

/// Monotonic identifier of one physical connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Notification from a [`LivenessTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// The connection has been idle for the ping interval.
    WantPing(ConnectionId),
    /// No traffic arrived within the grace period after `WantPing`.
    Timeout(ConnectionId),
}

impl Signal {
    pub fn connection(&self) -> ConnectionId {
        match *self {
            Signal::WantPing(id) | Signal::Timeout(id) => id,
        }
    }
}

/// Handle to a running liveness task.
#[derive(Debug)]
pub struct LivenessTimer {
    id: ConnectionId,
    activity: Arc<Notify>,
    task: JoinHandle<()>,
}

impl LivenessTimer {
    /// Spawn the timer task. Must be called inside a tokio runtime.
    pub fn start(
        id: ConnectionId,
        idle: Duration,
        grace: Duration,
        tx: mpsc::UnboundedSender<Signal>,
    ) -> Self {
        let activity = Arc::new(Notify::new());
        let task = tokio::spawn(run(id, idle, grace, activity.clone(), tx));
        LivenessTimer { id, activity, task }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Record inbound traffic, restarting the idle countdown.
    pub fn notify_activity(&self) {
        self.activity.notify_one();
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for LivenessTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    id: ConnectionId,
    idle: Duration,
    grace: Duration,
    activity: Arc<Notify>,
    tx: mpsc::UnboundedSender<Signal>,
) {
    loop {
        if timeout(idle, activity.notified()).await.is_ok() {
            continue;
        }
        trace!(conn = id.0, "connection idle, requesting ping");
        if tx.send(Signal::WantPing(id)).is_err() {
            return;
        }
        if timeout(grace, activity.notified()).await.is_ok() {
            continue;
        }
        trace!(conn = id.0, "no traffic after ping");
        let _ = tx.send(Signal::Timeout(id));
        return;
    }
}
