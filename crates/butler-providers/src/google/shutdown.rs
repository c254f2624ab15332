//! Cancellation of the authorization flow and the reports.
//!
//! A [`ShutdownHandle`] is a cloneable flag backed by a watch channel. The
//! signal listener trips it on SIGINT/SIGTERM; tests trip it directly.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A handle for triggering or awaiting shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    /// Creates a handle that has not been triggered.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Triggers a shutdown.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown is triggered.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        loop {
            let triggered = *rx.borrow_and_update();
            if triggered || rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Spawns a task that triggers this handle on SIGINT or SIGTERM.
    ///
    /// Once installed the handlers replace the default signal behaviour for
    /// the rest of the process, even if the task is aborted. Whatever runs
    /// afterwards must watch this handle to stay interruptible.
    #[cfg(unix)]
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let handle = self.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("failed to install signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            handle.trigger();
            debug!("signal listener stopped");
        })
    }

    /// Spawns a task that triggers this handle on Ctrl-C.
    #[cfg(not(unix))]
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let handle = self.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received Ctrl-C, shutting down");
                handle.trigger();
            }
        })
    }
}
