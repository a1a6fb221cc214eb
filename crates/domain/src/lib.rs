//! Domain types for the Presentia attendance system.
//!
//! Everything here is pure data: roster entries, attendance events, the
//! permission list, catalog rows, and the codecs that map them to and from
//! the remote document store's positional string rows.

#![forbid(unsafe_code)]

mod attendance;
mod catalog;
mod permission;
mod scan;
mod student;

pub use attendance::{AttendanceEvent, AttendanceMode};
pub use catalog::{Course, ScheduleSlot};
pub use permission::{Capability, PermissionEntry, Role};
pub use scan::{encode_scan_payload, parse_scan_payload};
pub use student::{PhotoReference, Student, StudentId};

/// Returns the cell at `index`, or an empty string for short rows.
///
/// The remote store trims trailing empty columns from every row it
/// returns, so positional reads must default instead of failing.
pub(crate) fn cell(row: &[String], index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}
