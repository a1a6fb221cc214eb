use crate::catalog_store::CatalogStore;
use crate::ledger::AttendanceLedger;
use crate::outbox::Outbox;
use crate::roster_store::RosterStore;
use crate::snapshot::LocalSnapshot;

/// The in-memory collections every service operates on.
///
/// One instance per process, shared behind an `Arc`. The stores own their
/// own locks, so independent collections never contend with each other.
#[derive(Debug, Default)]
pub struct AppState {
    roster: RosterStore,
    ledger: AttendanceLedger,
    catalog: CatalogStore,
    outbox: Outbox,
}

impl AppState {
    /// Creates empty application state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the student roster.
    #[must_use]
    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    /// Returns the attendance ledger.
    #[must_use]
    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    /// Returns the course catalog and timetable.
    #[must_use]
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Returns the pending-append outbox.
    #[must_use]
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Copies every collection into a snapshot for durable storage.
    pub async fn capture_snapshot(&self) -> LocalSnapshot {
        LocalSnapshot {
            students: self.roster.snapshot().await,
            attendance: self.ledger.snapshot().await,
            courses: self.catalog.courses().await,
            schedules: self.catalog.schedules().await,
            pending_appends: self.outbox.snapshot().await,
        }
    }

    /// Replaces every collection from a loaded snapshot.
    pub async fn apply_snapshot(&self, snapshot: LocalSnapshot) {
        self.roster.replace_all(snapshot.students).await;
        self.ledger.replace_all(snapshot.attendance).await;
        self.catalog.replace_courses(snapshot.courses).await;
        self.catalog.replace_schedules(snapshot.schedules).await;
        self.outbox.replace_all(snapshot.pending_appends).await;
    }
}
