//! Worker message loop.
//!
//! Clients hold a [`WorkerChannel`] and send [`WorkerMessage`]s into the
//! loop. `SKIP_WAITING` is fire-and-forget; `GET_CACHE_INFO` gets its answer
//! back on the oneshot reply port carried in the message.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use swcache_core::{CacheInfo, Error, WorkerMessage};

use crate::lifecycle::LifecycleController;

/// Initiator-side handle to the worker message loop.
#[derive(Clone)]
pub struct WorkerChannel {
    tx: mpsc::Sender<WorkerMessage>,
}

/// Create the message channel. The receiver half goes to
/// [`run_message_loop`].
pub fn channel() -> (WorkerChannel, mpsc::Receiver<WorkerMessage>) {
    let (tx, rx) = mpsc::channel(32);
    (WorkerChannel { tx }, rx)
}

impl WorkerChannel {
    /// Ask the worker to activate immediately. Fire-and-forget.
    pub async fn skip_waiting(&self) -> Result<(), Error> {
        self.tx
            .send(WorkerMessage::SkipWaiting)
            .await
            .map_err(|_| Error::ChannelClosed("worker message loop is gone".into()))
    }

    /// Request a cache introspection snapshot.
    pub async fn cache_info(&self) -> Result<CacheInfo, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerMessage::GetCacheInfo { reply })
            .await
            .map_err(|_| Error::ChannelClosed("worker message loop is gone".into()))?;
        rx.await
            .map_err(|_| Error::ChannelClosed("worker dropped the reply port".into()))
    }
}

/// Drive the message loop until every sender is dropped.
pub async fn run_message_loop(
    lifecycle: Arc<LifecycleController>,
    sample_limit: usize,
    mut rx: mpsc::Receiver<WorkerMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            WorkerMessage::SkipWaiting => {
                if let Err(err) = lifecycle.skip_waiting().await {
                    tracing::warn!(error = %err, "skip_waiting failed");
                }
            }
            WorkerMessage::GetCacheInfo { reply } => match cache_info(&lifecycle, sample_limit).await {
                Ok(info) => {
                    let _ = reply.send(info);
                }
                // Dropping the reply port tells the requester the snapshot
                // failed.
                Err(err) => tracing::warn!(error = %err, "cache info failed"),
            },
        }
    }
    tracing::debug!("message loop finished");
}

async fn cache_info(lifecycle: &LifecycleController, sample_limit: usize) -> Result<CacheInfo, Error> {
    let handle = lifecycle.current_handle().await?;
    Ok(CacheInfo {
        generation: handle.generation().to_string(),
        entry_count: handle.entry_count().await?,
        total_size: handle.total_size().await?,
        entries: handle.sample(sample_limit).await?,
    })
}
