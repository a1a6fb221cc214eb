//! Remote synchronization: outbox flushes out, full refreshes in.
//!
//! The remote store is the source of truth for everything except the last
//! few seconds of local activity. A pull cycle reads every range wholesale
//! and replaces the in-memory collections, but only when a change
//! fingerprint says the raw rows actually differ, so the steady-state poll
//! is cheap and never disturbs readers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use presentia_core::AppResult;
use presentia_domain::{AttendanceEvent, Course, ScheduleSlot, Student};

use crate::ports::{
    DocumentRangeStore, Feedback, FeedbackSeverity, FeedbackSink, NamedRange, SnapshotCache,
};
use crate::state::AppState;

#[cfg(test)]
mod tests;

/// What a pull cycle did to one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The fingerprint matched; the collection was left untouched.
    Unchanged,
    /// The collection was replaced.
    Applied {
        /// Rows that decoded and were applied.
        rows: usize,
        /// Malformed rows that were dropped.
        skipped: usize,
    },
    /// The range could not be read; in-memory state was left untouched.
    Failed,
}

impl PullOutcome {
    /// Returns whether this outcome replaced the collection.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Per-collection outcomes of one pull cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullReport {
    /// Roster outcome.
    pub students: PullOutcome,
    /// Ledger outcome.
    pub attendance: PullOutcome,
    /// Course catalog outcome.
    pub courses: PullOutcome,
    /// Timetable outcome.
    pub schedules: PullOutcome,
}

impl PullReport {
    /// Returns whether any collection was replaced.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.students.changed()
            || self.attendance.changed()
            || self.courses.changed()
            || self.schedules.changed()
    }

    /// Returns whether any range failed to read.
    #[must_use]
    pub fn degraded(&self) -> bool {
        [self.students, self.attendance, self.courses, self.schedules]
            .iter()
            .any(|outcome| *outcome == PullOutcome::Failed)
    }
}

/// Where the synchronization machinery currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No pull has been attempted yet.
    Offline,
    /// A pull cycle is in flight.
    Syncing,
    /// The last cycle read every range.
    Synced,
    /// The last cycle failed at least one range; the next tick retries.
    Error,
}

/// Application service for outbox flushes and polling pulls.
pub struct SyncService {
    state: Arc<AppState>,
    remote: Arc<dyn DocumentRangeStore>,
    snapshot_cache: Arc<dyn SnapshotCache>,
    feedback: Arc<dyn FeedbackSink>,
    fingerprints: Mutex<HashMap<NamedRange, String>>,
    status: Mutex<SyncStatus>,
    last_pull_at: Mutex<Option<DateTime<Utc>>>,
    pulling: AtomicBool,
    flushing: AtomicBool,
}

/// Clears a busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn fingerprint(rows: &[Vec<String>]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        for value in row {
            hasher.update(value.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl SyncService {
    /// Creates a new synchronization service.
    #[must_use]
    pub fn new(
        state: Arc<AppState>,
        remote: Arc<dyn DocumentRangeStore>,
        snapshot_cache: Arc<dyn SnapshotCache>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            state,
            remote,
            snapshot_cache,
            feedback,
            fingerprints: Mutex::new(HashMap::new()),
            status: Mutex::new(SyncStatus::Offline),
            last_pull_at: Mutex::new(None),
            pulling: AtomicBool::new(false),
            flushing: AtomicBool::new(false),
        }
    }

    /// Restores in-memory state from the durable snapshot, if one exists.
    ///
    /// Fingerprints are seeded from the re-encoded rows: a remote row that
    /// decodes losslessly hashes identically, so the first poll after a
    /// restart is a no-op unless something actually changed while the
    /// process was down. Rows that do not round-trip just force one extra
    /// refresh.
    pub async fn hydrate_from_cache(&self) -> AppResult<bool> {
        let Some(snapshot) = self.snapshot_cache.load().await? else {
            return Ok(false);
        };

        let mut fingerprints = self.fingerprints.lock().await;
        fingerprints.insert(
            NamedRange::Students,
            fingerprint(&snapshot.students.iter().map(Student::to_row).collect::<Vec<_>>()),
        );
        fingerprints.insert(
            NamedRange::Attendance,
            fingerprint(
                &snapshot
                    .attendance
                    .iter()
                    .map(AttendanceEvent::to_row)
                    .collect::<Vec<_>>(),
            ),
        );
        fingerprints.insert(
            NamedRange::Courses,
            fingerprint(&snapshot.courses.iter().map(Course::to_row).collect::<Vec<_>>()),
        );
        fingerprints.insert(
            NamedRange::Schedules,
            fingerprint(
                &snapshot
                    .schedules
                    .iter()
                    .map(ScheduleSlot::to_row)
                    .collect::<Vec<_>>(),
            ),
        );
        drop(fingerprints);

        self.state.apply_snapshot(snapshot).await;
        Ok(true)
    }

    /// Drains the pending-append outbox, oldest row first.
    ///
    /// Stops at the first remote failure and leaves the rest queued; the
    /// next flush picks up where this one stopped. Returns the number of
    /// rows appended. A flush already in progress makes this a no-op.
    pub async fn flush_outbox(&self) -> AppResult<usize> {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(0);
        }
        let _guard = BusyGuard(&self.flushing);

        let mut flushed = 0;
        let result = loop {
            let Some(entry) = self.state.outbox().peek_front().await else {
                break Ok(());
            };

            match self
                .remote
                .append_rows(entry.range, vec![entry.row.clone()])
                .await
            {
                Ok(()) => {
                    self.state.outbox().pop_front_if(&entry).await;
                    flushed += 1;
                }
                Err(error) => {
                    self.feedback.notify(Feedback::new(
                        FeedbackSeverity::Warning,
                        "Sync pending",
                        format!(
                            "{} row(s) still waiting for the remote store: {error}",
                            self.state.outbox().len().await
                        ),
                    ));
                    break Err(error);
                }
            }
        };

        if flushed > 0 {
            self.persist_snapshot().await;
        }
        result.map(|()| flushed)
    }

    /// Runs one full pull cycle.
    ///
    /// Drains the outbox first, then fetches the four collections as
    /// independent requests; one failed range never aborts the others.
    /// Returns `None` when a cycle is already running, so an overlapping
    /// poll tick never doubles the remote reads.
    pub async fn pull_once(&self) -> Option<PullReport> {
        if self
            .pulling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _guard = BusyGuard(&self.pulling);

        *self.status.lock().await = SyncStatus::Syncing;

        // Locally recorded rows go out before the wholesale read, so a
        // healthy cycle pulls its own appends back instead of clobbering
        // them.
        let _ = self.flush_outbox().await;

        let report = PullReport {
            students: self.pull_students().await,
            attendance: self.pull_attendance().await,
            courses: self.pull_courses().await,
            schedules: self.pull_schedules().await,
        };

        *self.last_pull_at.lock().await = Some(Utc::now());
        *self.status.lock().await = if report.degraded() {
            SyncStatus::Error
        } else {
            SyncStatus::Synced
        };

        if report.changed() {
            self.persist_snapshot().await;
        }
        Some(report)
    }

    /// Returns the current synchronization status.
    pub async fn status(&self) -> SyncStatus {
        *self.status.lock().await
    }

    /// Returns when the last pull cycle completed, if any.
    pub async fn last_pull_at(&self) -> Option<DateTime<Utc>> {
        *self.last_pull_at.lock().await
    }

    async fn pull_students(&self) -> PullOutcome {
        let rows = match self.remote.read_range(NamedRange::Students).await {
            Ok(rows) => rows,
            Err(_) => return PullOutcome::Failed,
        };
        if self.unchanged(NamedRange::Students, &rows).await {
            return PullOutcome::Unchanged;
        }

        let mut students = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match Student::from_row(row) {
                Ok(student) => students.push(student),
                Err(_) => skipped += 1,
            }
        }

        let applied = students.len();
        self.state.roster().replace_all(students).await;
        self.remember(NamedRange::Students, &rows).await;
        PullOutcome::Applied {
            rows: applied,
            skipped,
        }
    }

    async fn pull_attendance(&self) -> PullOutcome {
        let rows = match self.remote.read_range(NamedRange::Attendance).await {
            Ok(rows) => rows,
            Err(_) => return PullOutcome::Failed,
        };
        if self.unchanged(NamedRange::Attendance, &rows).await {
            return PullOutcome::Unchanged;
        }

        let mut events = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match AttendanceEvent::from_row(row) {
                Ok(event) => events.push(event),
                Err(_) => skipped += 1,
            }
        }

        let applied = events.len();
        self.state.ledger().replace_all(events).await;
        self.remember(NamedRange::Attendance, &rows).await;
        PullOutcome::Applied {
            rows: applied,
            skipped,
        }
    }

    async fn pull_courses(&self) -> PullOutcome {
        let rows = match self.remote.read_range(NamedRange::Courses).await {
            Ok(rows) => rows,
            Err(_) => return PullOutcome::Failed,
        };
        if self.unchanged(NamedRange::Courses, &rows).await {
            return PullOutcome::Unchanged;
        }

        let courses: Vec<Course> = rows.iter().map(|row| Course::from_row(row)).collect();
        let applied = courses.len();
        self.state.catalog().replace_courses(courses).await;
        self.remember(NamedRange::Courses, &rows).await;
        PullOutcome::Applied {
            rows: applied,
            skipped: 0,
        }
    }

    async fn pull_schedules(&self) -> PullOutcome {
        let rows = match self.remote.read_range(NamedRange::Schedules).await {
            Ok(rows) => rows,
            Err(_) => return PullOutcome::Failed,
        };
        if self.unchanged(NamedRange::Schedules, &rows).await {
            return PullOutcome::Unchanged;
        }

        let schedules: Vec<ScheduleSlot> =
            rows.iter().map(|row| ScheduleSlot::from_row(row)).collect();
        let applied = schedules.len();
        self.state.catalog().replace_schedules(schedules).await;
        self.remember(NamedRange::Schedules, &rows).await;
        PullOutcome::Applied {
            rows: applied,
            skipped: 0,
        }
    }

    async fn unchanged(&self, range: NamedRange, rows: &[Vec<String>]) -> bool {
        self.fingerprints.lock().await.get(&range) == Some(&fingerprint(rows))
    }

    async fn remember(&self, range: NamedRange, rows: &[Vec<String>]) {
        self.fingerprints
            .lock()
            .await
            .insert(range, fingerprint(rows));
    }

    async fn persist_snapshot(&self) {
        let snapshot = self.state.capture_snapshot().await;
        if let Err(error) = self.snapshot_cache.store(&snapshot).await {
            self.feedback.notify(Feedback::new(
                FeedbackSeverity::Warning,
                "Local save failed",
                format!("the refreshed state lives in memory only: {error}"),
            ));
        }
    }
}
