use std::path::PathBuf;

use async_trait::async_trait;

use presentia_application::{LocalSnapshot, SnapshotCache};
use presentia_core::{AppError, AppResult};

/// JSON-file implementation of the durable snapshot.
///
/// Writes go to a sibling temp file first and are renamed into place, so
/// a crash mid-write leaves the previous snapshot intact.
pub struct JsonSnapshotCache {
    path: PathBuf,
}

impl JsonSnapshotCache {
    /// Creates a cache backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".tmp");
        PathBuf::from(path)
    }
}

#[async_trait]
impl SnapshotCache for JsonSnapshotCache {
    async fn load(&self) -> AppResult<Option<LocalSnapshot>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "snapshot file unreadable: {error}"
                )));
            }
        };

        let snapshot = serde_json::from_slice(&raw)
            .map_err(|error| AppError::Internal(format!("snapshot file corrupt: {error}")))?;
        Ok(Some(snapshot))
    }

    async fn store(&self, snapshot: &LocalSnapshot) -> AppResult<()> {
        let encoded = serde_json::to_vec(snapshot)
            .map_err(|error| AppError::Internal(format!("snapshot not serializable: {error}")))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| AppError::Internal(format!("snapshot dir not writable: {error}")))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, encoded)
            .await
            .map_err(|error| AppError::Internal(format!("snapshot write failed: {error}")))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|error| AppError::Internal(format!("snapshot rename failed: {error}")))?;
        Ok(())
    }
}
