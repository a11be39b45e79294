//! Handles for submitting payloads and controlling the background worker.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::element::ElementNode;
use crate::error::{PasteGuardError, Result};

/// One queued payload and the channel its answer goes back on.
pub(crate) struct Job {
    pub(crate) payload: Value,
    pub(crate) reply: oneshot::Sender<Option<ElementNode>>,
}

/// A submitted job whose answer has not been received yet.
#[must_use = "the sanitized tree is only available through `wait`"]
pub struct Pending {
    reply: oneshot::Receiver<Option<ElementNode>>,
}

impl Pending {
    /// Wait for the worker's answer.
    ///
    /// Returns [`PasteGuardError::WorkerStopped`] if the worker dropped the
    /// job without answering.
    pub async fn wait(self) -> Result<Option<ElementNode>> {
        self.reply.await.map_err(|_| PasteGuardError::WorkerStopped)
    }
}

/// Primary handle returned by [`EngineBuilder::spawn`](crate::EngineBuilder::spawn).
///
/// Owns the shutdown signal and the worker task join handle. Dropping the
/// handle stops the worker once the queued jobs are answered; prefer
/// [`shutdown`](Self::shutdown) to wait for that.
///
/// For sharing across multiple tasks, obtain a lightweight [`EngineSender`]
/// via [`sender`](Self::sender).
pub struct EngineHandle {
    sender: EngineSender,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<Job>,
        shutdown: oneshot::Sender<()>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            sender: EngineSender { sender },
            shutdown: Some(shutdown),
            worker: Some(worker),
        }
    }

    /// Queue a payload without waiting for channel capacity.
    ///
    /// Returns [`PasteGuardError::ChannelClosed`] if the channel is full or
    /// the worker has stopped.
    pub fn try_submit(&self, payload: Value) -> Result<Pending> {
        self.sender.try_submit(payload)
    }

    /// Queue a payload, waiting for capacity, and wait for its sanitized tree.
    pub async fn sanitize(&self, payload: Value) -> Result<Option<ElementNode>> {
        self.sender.sanitize(payload).await
    }

    /// Create a lightweight, cloneable [`EngineSender`] that shares the same
    /// underlying channel.
    pub fn sender(&self) -> EngineSender {
        self.sender.clone()
    }

    /// Gracefully shut down the background worker.
    ///
    /// Sends a shutdown signal and waits for the worker to answer every job
    /// that was already queued.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                tracing::error!("Sanitization worker failed: {e}");
            }
        }
    }
}

/// Lightweight, cloneable sender for submitting payloads from multiple tasks.
///
/// Obtained via [`EngineHandle::sender`]. Does **not** own the shutdown
/// signal: once the handle shuts down, submissions fail with
/// [`PasteGuardError::ChannelClosed`].
#[derive(Clone)]
pub struct EngineSender {
    sender: mpsc::Sender<Job>,
}

impl EngineSender {
    /// Queue a payload without waiting for channel capacity.
    pub fn try_submit(&self, payload: Value) -> Result<Pending> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .try_send(Job { payload, reply })
            .map_err(|_| PasteGuardError::ChannelClosed)?;
        Ok(Pending { reply: rx })
    }

    /// Queue a payload, waiting for capacity, and wait for its sanitized tree.
    pub async fn sanitize(&self, payload: Value) -> Result<Option<ElementNode>> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Job { payload, reply })
            .await
            .map_err(|_| PasteGuardError::ChannelClosed)?;
        Pending { reply: rx }.wait().await
    }
}
