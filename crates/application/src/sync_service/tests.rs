use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use presentia_core::{AppError, AppResult};
use presentia_domain::{PhotoReference, Student, StudentId};

use crate::ports::{DocumentRangeStore, Feedback, FeedbackSink, NamedRange, SnapshotCache};
use crate::snapshot::LocalSnapshot;
use crate::state::AppState;

use super::{PullOutcome, SyncService, SyncStatus};

#[derive(Default)]
struct FakeRemote {
    rows: Mutex<HashMap<NamedRange, Vec<Vec<String>>>>,
    appended: Mutex<Vec<(NamedRange, Vec<Vec<String>>)>>,
    fail_appends: AtomicBool,
    fail_reads: Mutex<HashSet<NamedRange>>,
}

impl FakeRemote {
    async fn set_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) {
        self.rows.lock().await.insert(range, rows);
    }

    async fn fail_reads_of(&self, range: NamedRange) {
        self.fail_reads.lock().await.insert(range);
    }
}

#[async_trait]
impl DocumentRangeStore for FakeRemote {
    async fn read_range(&self, range: NamedRange) -> AppResult<Vec<Vec<String>>> {
        if self.fail_reads.lock().await.contains(&range) {
            return Err(AppError::Unavailable("range unreachable".to_owned()));
        }
        Ok(self.rows.lock().await.get(&range).cloned().unwrap_or_default())
    }

    async fn append_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Unavailable("remote store offline".to_owned()));
        }
        self.appended.lock().await.push((range, rows));
        Ok(())
    }

    async fn clear_range(&self, range: NamedRange) -> AppResult<()> {
        self.rows.lock().await.remove(&range);
        Ok(())
    }

    async fn overwrite_range(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()> {
        self.rows.lock().await.insert(range, rows);
        Ok(())
    }
}

#[derive(Default)]
struct FakeSnapshotCache {
    stored: Mutex<Vec<LocalSnapshot>>,
}

#[async_trait]
impl SnapshotCache for FakeSnapshotCache {
    async fn load(&self) -> AppResult<Option<LocalSnapshot>> {
        Ok(self.stored.lock().await.last().cloned())
    }

    async fn store(&self, snapshot: &LocalSnapshot) -> AppResult<()> {
        self.stored.lock().await.push(snapshot.clone());
        Ok(())
    }
}

struct SilentFeedback;

impl FeedbackSink for SilentFeedback {
    fn notify(&self, _feedback: Feedback) {}
}

struct Harness {
    state: Arc<AppState>,
    remote: Arc<FakeRemote>,
    snapshot_cache: Arc<FakeSnapshotCache>,
    service: SyncService,
}

fn harness() -> Harness {
    let state = Arc::new(AppState::new());
    let remote = Arc::new(FakeRemote::default());
    let snapshot_cache = Arc::new(FakeSnapshotCache::default());
    let service = SyncService::new(
        Arc::clone(&state),
        remote.clone(),
        snapshot_cache.clone(),
        Arc::new(SilentFeedback),
    );
    Harness {
        state,
        remote,
        snapshot_cache,
        service,
    }
}

fn student(id: &str, photo: PhotoReference) -> Student {
    Student::new(
        StudentId::from_raw(id),
        "Ana Pérez",
        "1234567",
        "3° Secundaria",
        "A",
        "",
        "",
        photo,
        "",
        chrono::Utc::now(),
        "tests",
    )
    .unwrap_or_else(|_| panic!("valid student"))
}

fn attendance_row(id: &str, time: &str) -> Vec<String> {
    vec![
        id.to_owned(),
        "Ana Pérez".to_owned(),
        "1234567".to_owned(),
        "3° Secundaria".to_owned(),
        "A".to_owned(),
        "2024-03-01".to_owned(),
        time.to_owned(),
        "ENTRADA".to_owned(),
        "operator".to_owned(),
    ]
}

async fn report(harness: &Harness) -> super::PullReport {
    match harness.service.pull_once().await {
        Some(report) => report,
        None => panic!("pull cycle was dropped"),
    }
}

#[tokio::test]
async fn second_pull_of_identical_rows_is_unchanged() {
    let harness = harness();
    harness
        .remote
        .set_rows(NamedRange::Attendance, vec![attendance_row("S1", "08:00:00")])
        .await;

    let first = report(&harness).await;
    assert_eq!(
        first.attendance,
        PullOutcome::Applied { rows: 1, skipped: 0 }
    );
    assert_eq!(harness.state.ledger().len().await, 1);

    let second = report(&harness).await;
    assert_eq!(second.attendance, PullOutcome::Unchanged);
    assert!(!second.changed());
}

#[tokio::test]
async fn malformed_rows_are_skipped_not_fatal() {
    let harness = harness();
    harness
        .remote
        .set_rows(
            NamedRange::Attendance,
            vec![
                attendance_row("S1", "08:00:00"),
                vec!["S2".to_owned(), "junk".to_owned()],
            ],
        )
        .await;

    let outcome = report(&harness).await.attendance;
    assert_eq!(outcome, PullOutcome::Applied { rows: 1, skipped: 1 });
    assert_eq!(harness.state.ledger().len().await, 1);
}

#[tokio::test]
async fn one_failed_range_does_not_abort_the_others() {
    let harness = harness();
    harness
        .state
        .roster()
        .insert(student("S1", PhotoReference::Missing))
        .await
        .ok();
    harness.remote.fail_reads_of(NamedRange::Students).await;
    harness
        .remote
        .set_rows(NamedRange::Attendance, vec![attendance_row("S1", "08:00:00")])
        .await;

    let outcome = report(&harness).await;
    assert_eq!(outcome.students, PullOutcome::Failed);
    assert_eq!(
        outcome.attendance,
        PullOutcome::Applied { rows: 1, skipped: 0 }
    );

    // The unreadable roster stayed exactly as it was.
    assert_eq!(harness.state.roster().len().await, 1);
    assert_eq!(harness.service.status().await, SyncStatus::Error);
}

#[tokio::test]
async fn status_reaches_synced_after_a_clean_cycle() {
    let harness = harness();
    assert_eq!(harness.service.status().await, SyncStatus::Offline);

    let outcome = report(&harness).await;
    assert!(!outcome.degraded());
    assert_eq!(harness.service.status().await, SyncStatus::Synced);
    assert!(harness.service.last_pull_at().await.is_some());
}

#[tokio::test]
async fn pull_preserves_locally_cached_inline_photos() {
    let harness = harness();
    let inline = PhotoReference::Inline("data:image/jpeg;base64,abcd".to_owned());
    harness
        .state
        .roster()
        .insert(student("S1", inline.clone()))
        .await
        .ok();

    // The remote row carries only a URL reference for S1.
    let remote_row = student("S1", PhotoReference::Url("https://objects/x.jpg".to_owned()));
    harness
        .remote
        .set_rows(NamedRange::Students, vec![remote_row.to_row()])
        .await;

    report(&harness).await;

    let merged = harness
        .state
        .roster()
        .find_by_id(&StudentId::from_raw("S1"))
        .await;
    assert_eq!(merged.map(|student| student.photo().clone()), Some(inline));
}

#[tokio::test]
async fn pull_cycle_drains_the_outbox_before_reading() {
    let harness = harness();
    harness
        .state
        .outbox()
        .push(NamedRange::Attendance, attendance_row("S1", "08:00:00"))
        .await;

    report(&harness).await;

    assert!(harness.state.outbox().is_empty().await);
    assert_eq!(harness.remote.appended.lock().await.len(), 1);
}

#[tokio::test]
async fn flush_drains_the_outbox_in_order() {
    let harness = harness();
    harness
        .state
        .outbox()
        .push(NamedRange::Attendance, attendance_row("S1", "08:00:00"))
        .await;
    harness
        .state
        .outbox()
        .push(NamedRange::Attendance, attendance_row("S2", "08:01:00"))
        .await;

    let flushed = harness.service.flush_outbox().await;
    assert_eq!(flushed.ok(), Some(2));
    assert!(harness.state.outbox().is_empty().await);

    let appended = harness.remote.appended.lock().await;
    assert_eq!(appended.len(), 2);
    assert_eq!(appended[0].1[0][0], "S1");
    assert_eq!(appended[1].1[0][0], "S2");
    drop(appended);

    // The shrunk queue was persisted.
    let stored = harness.snapshot_cache.stored.lock().await;
    let last = stored.last().unwrap_or_else(|| panic!("snapshot was stored"));
    assert!(last.pending_appends.is_empty());
}

#[tokio::test]
async fn flush_stops_at_first_failure_and_keeps_the_queue() {
    let harness = harness();
    harness
        .state
        .outbox()
        .push(NamedRange::Attendance, attendance_row("S1", "08:00:00"))
        .await;
    harness.remote.fail_appends.store(true, Ordering::SeqCst);

    let flushed = harness.service.flush_outbox().await;
    assert!(flushed.is_err());
    assert_eq!(harness.state.outbox().len().await, 1);

    // The remote comes back; the same row flushes on the next attempt.
    harness.remote.fail_appends.store(false, Ordering::SeqCst);
    let retried = harness.service.flush_outbox().await;
    assert_eq!(retried.ok(), Some(1));
    assert!(harness.state.outbox().is_empty().await);
}

#[tokio::test]
async fn hydrate_then_pull_of_equivalent_rows_is_a_no_op() {
    let harness = harness();
    let cached = student("S1", PhotoReference::Missing);
    let snapshot = LocalSnapshot {
        students: vec![cached.clone()],
        ..LocalSnapshot::default()
    };
    harness.snapshot_cache.stored.lock().await.push(snapshot);

    let hydrated = harness.service.hydrate_from_cache().await;
    assert_eq!(hydrated.ok(), Some(true));
    assert_eq!(harness.state.roster().len().await, 1);

    harness
        .remote
        .set_rows(NamedRange::Students, vec![cached.to_row()])
        .await;
    let outcome = report(&harness).await;
    assert_eq!(outcome.students, PullOutcome::Unchanged);
}

#[tokio::test]
async fn hydrate_without_a_snapshot_reports_false() {
    let harness = harness();
    let hydrated = harness.service.hydrate_from_cache().await;
    assert_eq!(hydrated.ok(), Some(false));
    assert!(harness.state.roster().is_empty().await);
}
