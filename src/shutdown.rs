//! Cooperative cancellation for whole runs
//!
//! Drivers check the signal before dispatching each node. Work already in
//! flight is allowed to finish, so a node is never left half-written: it is
//! either fully processed or still in its resumable starting state.

use tokio::sync::watch;

/// Receiving side of a shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending side of a shutdown signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Creates a linked trigger/signal pair
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        let (_trigger, shutdown) = Self::channel();
        shutdown
    }

    /// A signal that fires on Ctrl-C
    pub fn on_ctrl_c() -> Self {
        let (trigger, shutdown) = Self::channel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Shutdown requested, finishing in-flight nodes");
                trigger.trigger();
            }
        });
        shutdown
    }

    /// Returns true once shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace works even when every receiver is gone
        self.tx.send_replace(true);
    }
}
