use presentia_domain::{AttendanceEvent, Course, ScheduleSlot, Student};
use serde::{Deserialize, Serialize};

use crate::outbox::PendingAppend;

/// The durable mirror of all in-memory collections.
///
/// A passive serialization target: every local mutation writes a fresh
/// snapshot through the cache port, and startup replays the last one so a
/// restart resumes exactly where the previous session stopped. Fields
/// added after the first deployed format default when absent, so an old
/// cache file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    /// Roster rows.
    pub students: Vec<Student>,
    /// Attendance events.
    pub attendance: Vec<AttendanceEvent>,
    /// Course catalog.
    #[serde(default)]
    pub courses: Vec<Course>,
    /// Timetable slots.
    #[serde(default)]
    pub schedules: Vec<ScheduleSlot>,
    /// Rows recorded locally but not yet appended remotely.
    #[serde(default)]
    pub pending_appends: Vec<PendingAppend>,
}
