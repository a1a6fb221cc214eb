//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod drive_object_store;
mod in_memory_document_store;
mod json_session_cache;
mod json_snapshot_cache;
mod sheets_document_store;
mod static_identity_provider;
mod tokio_background_flusher;
mod tracing_feedback_sink;

pub use drive_object_store::DriveObjectStore;
pub use in_memory_document_store::InMemoryDocumentStore;
pub use json_session_cache::JsonSessionCache;
pub use json_snapshot_cache::JsonSnapshotCache;
pub use sheets_document_store::{SheetsConfig, SheetsDocumentStore};
pub use static_identity_provider::StaticIdentityProvider;
pub use tokio_background_flusher::TokioBackgroundFlusher;
pub use tracing_feedback_sink::TracingFeedbackSink;
