use std::path::PathBuf;

use async_trait::async_trait;

use presentia_application::{Session, SessionCache};
use presentia_core::{AppError, AppResult};

/// JSON-file implementation of the session record.
///
/// A corrupt or unreadable file behaves like no session at all; the worst
/// outcome is one extra interactive sign-in.
pub struct JsonSessionCache {
    path: PathBuf,
}

impl JsonSessionCache {
    /// Creates a cache backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionCache for JsonSessionCache {
    async fn load(&self) -> AppResult<Option<Session>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        };
        Ok(serde_json::from_slice(&raw).ok())
    }

    async fn store(&self, session: &Session) -> AppResult<()> {
        let encoded = serde_json::to_vec(session)
            .map_err(|error| AppError::Internal(format!("session not serializable: {error}")))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| AppError::Internal(format!("session dir not writable: {error}")))?;
        }
        tokio::fs::write(&self.path, encoded)
            .await
            .map_err(|error| AppError::Internal(format!("session write failed: {error}")))
    }

    async fn clear(&self) -> AppResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AppError::Internal(format!("session clear failed: {error}"))),
        }
    }
}
