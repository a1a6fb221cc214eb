//! The scan pipeline: decoded QR payload in, attendance event out.
//!
//! Order matters here. A scan is validated against the roster, checked and
//! recorded in the ledger atomically, persisted to the durable local
//! snapshot, and only then handed to the background flusher for the remote
//! append. A scan that fails validation changes nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDate, NaiveTime, Timelike};

use presentia_domain::{AttendanceEvent, AttendanceMode, StudentId, parse_scan_payload};

use crate::ledger::LedgerInsert;
use crate::ports::{BackgroundFlusher, Feedback, FeedbackSeverity, FeedbackSink, NamedRange, SnapshotCache};
use crate::state::AppState;


/// What a processed scan amounted to.
///
/// Unknown codes and occupied slots are outcomes, not errors: the scan
/// pipeline absorbs whatever the decoder produces and reports what it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A new event was recorded and queued for remote append.
    Recorded(AttendanceEvent),
    /// The daily slot was already taken; the existing event is returned.
    AlreadyRecorded(AttendanceEvent),
    /// No enrolled student matches the scanned identifier.
    NotFound {
        /// The identifier extracted from the payload.
        identifier: StudentId,
    },
    /// Another scan was still being processed; this one was dropped.
    Busy,
}

/// Application service for the scan pipeline.
#[derive(Clone)]
pub struct ScanService {
    state: Arc<AppState>,
    snapshot_cache: Arc<dyn SnapshotCache>,
    feedback: Arc<dyn FeedbackSink>,
    flusher: Arc<dyn BackgroundFlusher>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the scan finishes, on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ScanService {
    /// Creates a new scan service.
    #[must_use]
    pub fn new(
        state: Arc<AppState>,
        snapshot_cache: Arc<dyn SnapshotCache>,
        feedback: Arc<dyn FeedbackSink>,
        flusher: Arc<dyn BackgroundFlusher>,
    ) -> Self {
        Self {
            state,
            snapshot_cache,
            feedback,
            flusher,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Processes a scanned payload at the current local date and time.
    pub async fn process_scan(
        &self,
        payload: &str,
        mode: AttendanceMode,
        recorded_by: &str,
    ) -> ScanOutcome {
        let now = Local::now();
        let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());
        self.process_scan_at(payload, mode, recorded_by, now.date_naive(), time)
            .await
    }

    /// Processes a scanned payload at an explicit date and time.
    pub async fn process_scan_at(
        &self,
        payload: &str,
        mode: AttendanceMode,
        recorded_by: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ScanOutcome {
        // Camera decoders fire repeatedly while a code stays in frame;
        // only one scan is processed at a time and the rest are dropped.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ScanOutcome::Busy;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let student_id = parse_scan_payload(payload);
        let Some(student) = self.state.roster().find_by_id(&student_id).await else {
            self.feedback.notify(Feedback::new(
                FeedbackSeverity::Error,
                "Unknown code",
                format!("no enrolled student matches '{student_id}'"),
            ));
            return ScanOutcome::NotFound {
                identifier: student_id,
            };
        };

        let event = AttendanceEvent::for_student(&student, date, time, mode, recorded_by);
        match self.state.ledger().try_record(event.clone()).await {
            LedgerInsert::Duplicate(existing) => {
                self.feedback.notify(Feedback::new(
                    FeedbackSeverity::Warning,
                    "Already recorded",
                    format!(
                        "{} already has {} at {} today",
                        existing.name(),
                        existing.mode(),
                        existing.time().format("%H:%M:%S"),
                    ),
                ));
                ScanOutcome::AlreadyRecorded(existing)
            }
            LedgerInsert::Recorded => {
                self.state
                    .outbox()
                    .push(NamedRange::Attendance, event.to_row())
                    .await;
                self.persist_snapshot().await;
                self.flusher.request_flush();
                self.feedback.notify(Feedback::new(
                    FeedbackSeverity::Success,
                    "Attendance recorded",
                    format!("{} · {}", event.name(), event.mode()),
                ));
                ScanOutcome::Recorded(event)
            }
        }
    }

    /// Writes the current state to the durable snapshot.
    ///
    /// The event is already in the ledger and the outbox at this point; a
    /// failed write degrades durability across a restart but must not fail
    /// the scan, so it surfaces as a warning only.
    async fn persist_snapshot(&self) {
        let snapshot = self.state.capture_snapshot().await;
        if let Err(error) = self.snapshot_cache.store(&snapshot).await {
            self.feedback.notify(Feedback::new(
                FeedbackSeverity::Warning,
                "Local save failed",
                format!("the event is recorded in memory only: {error}"),
            ));
        }
    }
}
