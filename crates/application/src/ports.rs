use async_trait::async_trait;
use presentia_core::AppResult;
use serde::{Deserialize, Serialize};

use crate::snapshot::LocalSnapshot;

/// The named ranges the attendance system reads and writes.
///
/// Each variant maps to one tab of the shared spreadsheet-style resource;
/// the adapter owns the translation to concrete A1-style range strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedRange {
    /// Roster rows.
    Students,
    /// Attendance event rows.
    Attendance,
    /// Course catalog rows.
    Courses,
    /// Timetable rows.
    Schedules,
    /// Permission list rows.
    Permissions,
}

impl NamedRange {
    /// Returns the tab name in the shared resource.
    #[must_use]
    pub fn tab(&self) -> &'static str {
        match self {
            Self::Students => "Estudiantes",
            Self::Attendance => "Asistencia",
            Self::Courses => "Cursos",
            Self::Schedules => "Horarios",
            Self::Permissions => "Permisos",
        }
    }

    /// Returns the A1-style read range, skipping the header row.
    #[must_use]
    pub fn read_span(&self) -> &'static str {
        match self {
            Self::Students => "Estudiantes!A2:L",
            Self::Attendance => "Asistencia!A2:I",
            Self::Courses => "Cursos!A2:E",
            Self::Schedules => "Horarios!A2:F",
            Self::Permissions => "Permisos!A2:C",
        }
    }
}

/// Port over the remote tabular document store.
///
/// Four primitives against named ranges; everything else in the system is
/// built from these. Row order inside a range is store-defined.
#[async_trait]
pub trait DocumentRangeStore: Send + Sync {
    /// Reads every row of a range.
    async fn read_range(&self, range: NamedRange) -> AppResult<Vec<Vec<String>>>;

    /// Appends rows at the end of a range.
    async fn append_rows(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()>;

    /// Clears every row of a range.
    async fn clear_range(&self, range: NamedRange) -> AppResult<()>;

    /// Replaces the full contents of a range.
    async fn overwrite_range(&self, range: NamedRange, rows: Vec<Vec<String>>) -> AppResult<()>;
}

/// Port over the binary object store used to archive photo and QR images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads an encoded `data:` URL and returns a public URL.
    async fn upload(&self, file_name: &str, data_url: &str, mime_type: &str) -> AppResult<String>;
}

/// Port over the durable local snapshot record.
///
/// A passive serialization target: it owns no invariants, it just mirrors
/// the in-memory collections so a reload starts where the last session
/// stopped.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Loads the stored snapshot, if one exists.
    async fn load(&self) -> AppResult<Option<LocalSnapshot>>;

    /// Overwrites the stored snapshot.
    async fn store(&self, snapshot: &LocalSnapshot) -> AppResult<()>;
}

/// Severity of an operator-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackSeverity {
    /// Neutral progress information.
    Info,
    /// A completed operation.
    Success,
    /// Something degraded but the operation continued.
    Warning,
    /// A terminal, user-visible failure (no retry implied).
    Error,
}

/// One transient, dismissable operator notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Notification severity.
    pub severity: FeedbackSeverity,
    /// Short headline.
    pub title: String,
    /// Longer detail line.
    pub detail: String,
}

impl Feedback {
    /// Creates a notification.
    #[must_use]
    pub fn new(
        severity: FeedbackSeverity,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            detail: detail.into(),
        }
    }
}

/// Port for non-blocking operator notifications.
///
/// Implementations must return immediately; a failure to display feedback
/// is never allowed to fail the operation that produced it.
pub trait FeedbackSink: Send + Sync {
    /// Emits a notification.
    fn notify(&self, feedback: Feedback);
}

/// Port that requests a detached drain of the pending-append outbox.
///
/// Callers fire and forget: the flush runs outside their control flow and
/// reports problems through the [`FeedbackSink`], never to the caller.
pub trait BackgroundFlusher: Send + Sync {
    /// Schedules an outbox flush without awaiting it.
    fn request_flush(&self);
}
