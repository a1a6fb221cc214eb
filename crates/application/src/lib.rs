//! Application services and ports for the Presentia attendance core.
//!
//! This crate owns all mutable state (roster, ledger, catalog, outbox) and
//! the services that drive it: scan processing, remote synchronization,
//! session handling, and registration. Everything external — the remote
//! document store, the object store, the local caches, the identity
//! provider — is reached through ports implemented in the infrastructure
//! crate.

#![forbid(unsafe_code)]

mod auth_service;
mod catalog_store;
mod ledger;
mod outbox;
mod ports;
mod registration_service;
mod roster_store;
mod scan_service;
mod snapshot;
mod state;
mod sync_service;

pub use auth_service::{
    AuthService, IdentityProvider, SESSION_TTL_MINUTES, Session, SessionCache,
};
pub use catalog_store::CatalogStore;
pub use ledger::{AttendanceLedger, LedgerInsert};
pub use outbox::{Outbox, PendingAppend};
pub use ports::{
    BackgroundFlusher, DocumentRangeStore, Feedback, FeedbackSeverity, FeedbackSink, NamedRange,
    ObjectStore, SnapshotCache,
};
pub use registration_service::{RegisterStudentInput, RegistrationService};
pub use roster_store::RosterStore;
pub use scan_service::{ScanOutcome, ScanService};
pub use snapshot::LocalSnapshot;
pub use state::AppState;
pub use sync_service::{PullOutcome, PullReport, SyncService, SyncStatus};
