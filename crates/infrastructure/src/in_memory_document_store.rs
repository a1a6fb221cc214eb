use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use presentia_application::{DocumentRangeStore, NamedRange};
use presentia_core::AppResult;

/// In-memory implementation of the document range store.
///
/// Backs the kiosk's offline mode: the device keeps recording against
/// this store when no remote configuration is present, and the durable
/// snapshot still captures everything that matters.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    ranges: RwLock<HashMap<NamedRange, Vec<Vec<String>>>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRangeStore for InMemoryDocumentStore {
    async fn read_range(&self, range: NamedRange) -> AppResult<Vec<Vec<String>>> {
        Ok(self
            .ranges
            .read()
            .await
            .get(&range)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        self.ranges
            .write()
            .await
            .entry(range)
            .or_default()
            .extend(rows);
        Ok(())
    }

    async fn clear_range(&self, range: NamedRange) -> AppResult<()> {
        self.ranges.write().await.remove(&range);
        Ok(())
    }

    async fn overwrite_range(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        self.ranges.write().await.insert(range, rows);
        Ok(())
    }
}
