use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ports::NamedRange;

/// One row waiting to be appended to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAppend {
    /// Target range of the append.
    pub range: NamedRange,
    /// The encoded row.
    pub row: Vec<String>,
}

/// Queue of rows recorded locally but not yet appended remotely.
///
/// FIFO, so remote row order follows local record order. The queue is
/// part of the durable snapshot: a crash between the local record and the
/// remote append loses nothing, the row is retried on the next flush.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: RwLock<VecDeque<PendingAppend>>,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a row for remote append.
    pub async fn push(&self, range: NamedRange, row: Vec<String>) {
        self.pending
            .write()
            .await
            .push_back(PendingAppend { range, row });
    }

    /// Returns the oldest pending row without removing it.
    pub async fn peek_front(&self) -> Option<PendingAppend> {
        self.pending.read().await.front().cloned()
    }

    /// Removes the front entry if it still matches the given one.
    ///
    /// The flush loop peeks, performs the remote append outside any lock,
    /// then confirms here. New rows only ever arrive at the back, so a
    /// matching front is the row that was just appended.
    pub async fn pop_front_if(&self, expected: &PendingAppend) -> bool {
        let mut pending = self.pending.write().await;
        if pending.front() == Some(expected) {
            pending.pop_front();
            return true;
        }
        false
    }

    /// Replaces the queue wholesale from a loaded snapshot.
    pub async fn replace_all(&self, entries: Vec<PendingAppend>) {
        *self.pending.write().await = entries.into();
    }

    /// Returns a copy of the queue in flush order.
    pub async fn snapshot(&self) -> Vec<PendingAppend> {
        self.pending.read().await.iter().cloned().collect()
    }

    /// Returns the number of pending rows.
    pub async fn len(&self) -> usize {
        self.pending.read().await.len()
    }

    /// Returns whether the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.pending.read().await.is_empty()
    }
}
