use std::collections::HashSet;

use chrono::NaiveDate;
use presentia_domain::{AttendanceEvent, AttendanceMode, StudentId};
use tokio::sync::RwLock;

/// Result of an attempted ledger insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInsert {
    /// The event occupied a free daily slot and was appended.
    Recorded,
    /// The slot was taken; the existing event is returned untouched.
    Duplicate(AttendanceEvent),
}

/// Owns the append-only collection of attendance events.
///
/// The central invariant lives here: at most one event per
/// `(student, date, mode)`. Events are kept in insertion order, which on a
/// single device is wall-clock scan order.
#[derive(Debug, Default)]
pub struct AttendanceLedger {
    events: RwLock<Vec<AttendanceEvent>>,
}

impl AttendanceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the event unless its daily slot is already taken.
    ///
    /// The duplicate check and the append run under a single write guard.
    /// That atomicity is what upholds the invariant: two rapid scans of
    /// the same code cannot both pass the check, no matter how the calling
    /// tasks interleave.
    pub async fn try_record(&self, event: AttendanceEvent) -> LedgerInsert {
        let mut events = self.events.write().await;

        if let Some(existing) = events
            .iter()
            .find(|candidate| candidate.matches(event.student_id(), event.date(), event.mode()))
        {
            return LedgerInsert::Duplicate(existing.clone());
        }

        events.push(event);
        LedgerInsert::Recorded
    }

    /// Returns whether an event occupies the given daily slot.
    pub async fn has_event(
        &self,
        student_id: &StudentId,
        date: NaiveDate,
        mode: AttendanceMode,
    ) -> bool {
        self.events
            .read()
            .await
            .iter()
            .any(|event| event.matches(student_id, date, mode))
    }

    /// Replaces the ledger wholesale from a pulled snapshot.
    ///
    /// Atomic for readers: no caller can observe a partially replaced
    /// list.
    pub async fn replace_all(&self, events: Vec<AttendanceEvent>) {
        *self.events.write().await = events;
    }

    /// Returns the events of one day in insertion order.
    pub async fn events_on(&self, date: NaiveDate) -> Vec<AttendanceEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.date() == date)
            .cloned()
            .collect()
    }

    /// Counts students with at least one entry event on the given date.
    ///
    /// Counts distinct identities rather than raw events, so even if the
    /// duplicate invariant were bypassed (a hand-edited remote sheet, say)
    /// nobody is counted present twice.
    pub async fn count_distinct_present(&self, date: NaiveDate) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.date() == date && event.mode() == AttendanceMode::Entry)
            .map(AttendanceEvent::student_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Counts events of one mode on the given date.
    pub async fn count_events(&self, date: NaiveDate, mode: AttendanceMode) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.date() == date && event.mode() == mode)
            .count()
    }

    /// Returns a copy of the full ledger.
    pub async fn snapshot(&self) -> Vec<AttendanceEvent> {
        self.events.read().await.clone()
    }

    /// Returns the number of recorded events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns whether the ledger is empty.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}
