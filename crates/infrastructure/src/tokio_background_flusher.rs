use std::sync::Arc;

use presentia_application::{BackgroundFlusher, SyncService};

/// Background flusher that drains the outbox on a detached tokio task.
///
/// The caller returns immediately; a failed drain is logged and left for
/// the next flush request or pull cycle.
pub struct TokioBackgroundFlusher {
    sync: Arc<SyncService>,
}

impl TokioBackgroundFlusher {
    /// Creates a flusher driving the given sync service.
    #[must_use]
    pub fn new(sync: Arc<SyncService>) -> Self {
        Self { sync }
    }
}

impl BackgroundFlusher for TokioBackgroundFlusher {
    fn request_flush(&self) {
        let sync = Arc::clone(&self.sync);
        tokio::spawn(async move {
            match sync.flush_outbox().await {
                Ok(flushed) if flushed > 0 => {
                    tracing::debug!(flushed, "outbox drained");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%error, "outbox flush failed; rows stay queued");
                }
            }
        });
    }
}
