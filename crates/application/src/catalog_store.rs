use presentia_domain::{Course, ScheduleSlot};
use tokio::sync::RwLock;

/// Owns the course catalog and timetable, both read-mostly collections
/// refreshed wholesale on every pull.
#[derive(Debug, Default)]
pub struct CatalogStore {
    courses: RwLock<Vec<Course>>,
    schedules: RwLock<Vec<ScheduleSlot>>,
}

impl CatalogStore {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the course list wholesale.
    pub async fn replace_courses(&self, courses: Vec<Course>) {
        *self.courses.write().await = courses;
    }

    /// Replaces the timetable wholesale.
    pub async fn replace_schedules(&self, schedules: Vec<ScheduleSlot>) {
        *self.schedules.write().await = schedules;
    }

    /// Returns the names of courses currently offered, for the
    /// registration form's course picker.
    pub async fn active_course_names(&self) -> Vec<String> {
        self.courses
            .read()
            .await
            .iter()
            .filter(|course| course.is_active())
            .map(|course| course.name().to_owned())
            .collect()
    }

    /// Returns the timetable slots running on the given weekday name.
    pub async fn slots_on_day(&self, day: &str) -> Vec<ScheduleSlot> {
        self.schedules
            .read()
            .await
            .iter()
            .filter(|slot| slot.is_on_day(day))
            .cloned()
            .collect()
    }

    /// Returns a copy of the course list.
    pub async fn courses(&self) -> Vec<Course> {
        self.courses.read().await.clone()
    }

    /// Returns a copy of the timetable.
    pub async fn schedules(&self) -> Vec<ScheduleSlot> {
        self.schedules.read().await.clone()
    }
}
