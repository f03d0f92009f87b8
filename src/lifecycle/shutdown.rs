//! Shutdown coordination for the gateway.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the server and background tasks subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of subscribers still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait for `task` to finish, giving up after `grace`.
    ///
    /// Returns `false` when the grace period ran out and the task was aborted.
    pub async fn drain<T>(task: JoinHandle<T>, grace: Duration) -> bool {
        let abort = task.abort_handle();
        match tokio::time::timeout(grace, task).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline exceeded, aborting");
                abort.abort();
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
