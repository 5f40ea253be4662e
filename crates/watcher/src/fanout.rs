//! Notification fan-out
//!
//! Ready events and diagnostic messages are published on two independent
//! broadcast channels. Publishing never blocks: each listener owns its own
//! receiver, so a slow listener only lags itself and a listener that panics
//! only ends its own task.

use crate::events::{DiagnosticMessage, FileReady};
use std::future::Future;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Publisher side of the ready and diagnostic channels
#[derive(Debug, Clone)]
pub struct Notifications {
    ready_tx: broadcast::Sender<FileReady>,
    message_tx: broadcast::Sender<DiagnosticMessage>,
}

impl Notifications {
    /// Create both channels; `capacity` is the backlog kept per listener
    pub fn new(capacity: usize) -> Self {
        let (ready_tx, _) = broadcast::channel(capacity.max(1));
        let (message_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            ready_tx,
            message_tx,
        }
    }

    /// Subscribe to ready events published from now on
    pub fn subscribe_ready(&self) -> broadcast::Receiver<FileReady> {
        self.ready_tx.subscribe()
    }

    /// Subscribe to diagnostic messages published from now on
    pub fn subscribe_messages(&self) -> broadcast::Receiver<DiagnosticMessage> {
        self.message_tx.subscribe()
    }

    /// Publish a ready event, returning how many listeners it reached
    pub fn publish_ready(&self, ready: FileReady) -> usize {
        match self.ready_tx.send(ready) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(ready)) => {
                trace!("No ready listeners for {}", ready.name);
                0
            }
        }
    }

    /// Publish a diagnostic message, returning how many listeners it reached
    pub fn publish_message(&self, text: impl Into<String>) -> usize {
        self.message_tx
            .send(DiagnosticMessage::new(text))
            .unwrap_or(0)
    }

    /// Run `handler` for every ready event on its own task
    pub fn on_ready<F, Fut>(&self, handler: F) -> JoinHandle<()>
    where
        F: FnMut(FileReady) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        spawn_listener("ready", self.subscribe_ready(), handler)
    }

    /// Run `handler` for every diagnostic message on its own task
    pub fn on_message<F, Fut>(&self, handler: F) -> JoinHandle<()>
    where
        F: FnMut(DiagnosticMessage) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        spawn_listener("diagnostic", self.subscribe_messages(), handler)
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Drive a receiver until its channel closes
///
/// Lag is reported and skipped rather than treated as fatal.
pub fn spawn_listener<T, F, Fut>(
    channel: &'static str,
    mut receiver: broadcast::Receiver<T>,
    mut handler: F,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(item) => handler(item).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("{channel} listener lagged, skipped {skipped} notifications");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("{channel} listener stopped");
    })
}
