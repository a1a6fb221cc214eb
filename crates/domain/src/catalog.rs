use serde::{Deserialize, Serialize};

use crate::cell;

/// A course offered by the institution, sourced from the catalog sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: String,
    name: String,
    grade: String,
    active: bool,
    description: String,
}

impl Course {
    /// Decodes a positional sheet row. The active flag is the literal
    /// `SI`/`NO` the sheet uses, defaulting to active.
    #[must_use]
    pub fn from_row(row: &[String]) -> Self {
        let active_cell = cell(row, 3);
        Self {
            id: cell(row, 0),
            name: cell(row, 1),
            grade: cell(row, 2),
            active: active_cell.is_empty() || active_cell.to_uppercase() == "SI",
            description: cell(row, 4),
        }
    }

    /// Encodes the positional sheet row for this course.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.grade.clone(),
            if self.active { "SI" } else { "NO" }.to_owned(),
            self.description.clone(),
        ]
    }

    /// Returns the course identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the course name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the grade this course belongs to.
    #[must_use]
    pub fn grade(&self) -> &str {
        self.grade.as_str()
    }

    /// Returns whether the course is currently offered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }
}

/// One timetable slot from the schedules sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    course_id: String,
    course_name: String,
    day: String,
    start_time: String,
    end_time: String,
    room: String,
}

impl ScheduleSlot {
    /// Decodes a positional sheet row.
    #[must_use]
    pub fn from_row(row: &[String]) -> Self {
        Self {
            course_id: cell(row, 0),
            course_name: cell(row, 1),
            day: cell(row, 2),
            start_time: cell(row, 3),
            end_time: cell(row, 4),
            room: cell(row, 5),
        }
    }

    /// Encodes the positional sheet row for this slot.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.course_id.clone(),
            self.course_name.clone(),
            self.day.clone(),
            self.start_time.clone(),
            self.end_time.clone(),
            self.room.clone(),
        ]
    }

    /// Returns whether this slot runs on the given weekday name.
    ///
    /// Day names are stored in Spanish and compared case-insensitively.
    #[must_use]
    pub fn is_on_day(&self, day: &str) -> bool {
        self.day.to_lowercase() == day.trim().to_lowercase()
    }

    /// Returns the parent course identifier.
    #[must_use]
    pub fn course_id(&self) -> &str {
        self.course_id.as_str()
    }

    /// Returns the denormalized course name.
    #[must_use]
    pub fn course_name(&self) -> &str {
        self.course_name.as_str()
    }

    /// Returns the weekday label.
    #[must_use]
    pub fn day(&self) -> &str {
        self.day.as_str()
    }

    /// Returns the start time label.
    #[must_use]
    pub fn start_time(&self) -> &str {
        self.start_time.as_str()
    }

    /// Returns the end time label.
    #[must_use]
    pub fn end_time(&self) -> &str {
        self.end_time.as_str()
    }

    /// Returns the room label, empty when unassigned.
    #[must_use]
    pub fn room(&self) -> &str {
        self.room.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{Course, ScheduleSlot};

    #[test]
    fn course_active_flag_defaults_to_active() {
        let short = vec!["C1".to_owned(), "Matemáticas".to_owned()];
        assert!(Course::from_row(&short).is_active());

        let inactive = vec![
            "C2".to_owned(),
            "Física".to_owned(),
            "4°".to_owned(),
            "no".to_owned(),
        ];
        assert!(!Course::from_row(&inactive).is_active());
    }

    #[test]
    fn schedule_day_matching_ignores_case() {
        let slot = ScheduleSlot::from_row(&[
            "C1".to_owned(),
            "Matemáticas".to_owned(),
            "Lunes".to_owned(),
            "08:00".to_owned(),
            "09:30".to_owned(),
        ]);
        assert!(slot.is_on_day("lunes"));
        assert!(!slot.is_on_day("martes"));
        assert_eq!(slot.room(), "");
    }
}
