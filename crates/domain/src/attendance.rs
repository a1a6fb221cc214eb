use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use presentia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::cell;
use crate::student::{Student, StudentId};

/// The two independent attendance slots tracked per student per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceMode {
    /// Morning entry scan.
    Entry,
    /// Exit scan.
    Exit,
}

impl AttendanceMode {
    /// Returns the storage string used in the deployed sheets.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRADA",
            Self::Exit => "SALIDA",
        }
    }
}

impl FromStr for AttendanceMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "ENTRADA" => Ok(Self::Entry),
            "SALIDA" => Ok(Self::Exit),
            _ => Err(AppError::Validation(format!(
                "unknown attendance mode '{value}'"
            ))),
        }
    }
}

impl std::fmt::Display for AttendanceMode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One recorded entry or exit.
///
/// Student fields are denormalized at creation time so reports stay
/// readable even after the roster is replaced by a later pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    student_id: StudentId,
    name: String,
    document_number: String,
    course: String,
    schedule_label: String,
    date: NaiveDate,
    time: NaiveTime,
    mode: AttendanceMode,
    recorded_by: String,
}

impl AttendanceEvent {
    /// Creates an event for a scanned student, denormalizing its fields.
    #[must_use]
    pub fn for_student(
        student: &Student,
        date: NaiveDate,
        time: NaiveTime,
        mode: AttendanceMode,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student.id().clone(),
            name: student.name().to_owned(),
            document_number: student.document_number().to_owned(),
            course: student.course().to_owned(),
            schedule_label: student.schedule_label().to_owned(),
            date,
            time,
            mode,
            recorded_by: recorded_by.into(),
        }
    }

    /// Decodes a positional sheet row.
    ///
    /// Short rows default the denormalized text columns, but a row without
    /// an identifier, a parseable date and time, or a known mode is junk
    /// and gets rejected.
    pub fn from_row(row: &[String]) -> AppResult<Self> {
        let student_id = cell(row, 0);
        if student_id.trim().is_empty() {
            return Err(AppError::Validation(
                "attendance row is missing its student identifier".to_owned(),
            ));
        }

        let date = NaiveDate::parse_from_str(cell(row, 5).as_str(), "%Y-%m-%d")
            .map_err(|error| AppError::Validation(format!("bad attendance date: {error}")))?;
        let time = NaiveTime::parse_from_str(cell(row, 6).as_str(), "%H:%M:%S")
            .map_err(|error| AppError::Validation(format!("bad attendance time: {error}")))?;
        let mode = cell(row, 7).parse::<AttendanceMode>()?;

        Ok(Self {
            student_id: StudentId::from_raw(student_id),
            name: cell(row, 1),
            document_number: cell(row, 2),
            course: cell(row, 3),
            schedule_label: cell(row, 4),
            date,
            time,
            mode,
            recorded_by: cell(row, 8),
        })
    }

    /// Encodes the positional sheet row for this event.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.student_id.as_str().to_owned(),
            self.name.clone(),
            self.document_number.clone(),
            self.course.clone(),
            self.schedule_label.clone(),
            self.date.format("%Y-%m-%d").to_string(),
            self.time.format("%H:%M:%S").to_string(),
            self.mode.as_str().to_owned(),
            self.recorded_by.clone(),
        ]
    }

    /// Returns whether this event occupies the given daily slot.
    #[must_use]
    pub fn matches(&self, student_id: &StudentId, date: NaiveDate, mode: AttendanceMode) -> bool {
        &self.student_id == student_id && self.date == date && self.mode == mode
    }

    /// Returns the referenced student identifier.
    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    /// Returns the denormalized student name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the denormalized document number.
    #[must_use]
    pub fn document_number(&self) -> &str {
        self.document_number.as_str()
    }

    /// Returns the denormalized course label.
    #[must_use]
    pub fn course(&self) -> &str {
        self.course.as_str()
    }

    /// Returns the denormalized schedule label.
    #[must_use]
    pub fn schedule_label(&self) -> &str {
        self.schedule_label.as_str()
    }

    /// Returns the calendar date, in the device's local time zone.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the wall-clock time with second precision.
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Returns the attendance mode.
    #[must_use]
    pub fn mode(&self) -> AttendanceMode {
        self.mode
    }

    /// Returns the operator subject that recorded this event.
    #[must_use]
    pub fn recorded_by(&self) -> &str {
        self.recorded_by.as_str()
    }
}
