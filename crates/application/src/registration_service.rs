//! Student registration: roster entry, photo and QR archival, remote row.
//!
//! Registration is local-first like everything else: once the entry is
//! validated it always lands in the roster and the durable snapshot, while
//! image uploads and the remote append degrade gracefully when the network
//! is down.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use presentia_core::{AppError, AppResult};
use presentia_domain::{Capability, PhotoReference, Student, StudentId};

use crate::auth_service::Session;
use crate::ports::{
    DocumentRangeStore, Feedback, FeedbackSeverity, FeedbackSink, NamedRange, ObjectStore,
    SnapshotCache,
};
use crate::state::AppState;

#[cfg(test)]
mod tests;

/// The registration form, as captured by the operator.
#[derive(Debug, Clone, Default)]
pub struct RegisterStudentInput {
    /// Full name. Required.
    pub name: String,
    /// National document (carnet) number. Required, unique.
    pub document_number: String,
    /// Course label from the catalog picker.
    pub course: String,
    /// Schedule (section) label.
    pub schedule_label: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Captured photo as a `data:` URL, if one was taken.
    pub photo_data_url: Option<String>,
    /// Rendered QR image as a `data:` URL, if the device rendered one.
    pub qr_data_url: Option<String>,
}

/// Application service for enrolling students.
#[derive(Clone)]
pub struct RegistrationService {
    state: Arc<AppState>,
    remote: Arc<dyn DocumentRangeStore>,
    objects: Arc<dyn ObjectStore>,
    snapshot_cache: Arc<dyn SnapshotCache>,
    feedback: Arc<dyn FeedbackSink>,
}

fn mime_of(data_url: &str) -> &str {
    data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream")
}

impl RegistrationService {
    /// Creates a new registration service.
    #[must_use]
    pub fn new(
        state: Arc<AppState>,
        remote: Arc<dyn DocumentRangeStore>,
        objects: Arc<dyn ObjectStore>,
        snapshot_cache: Arc<dyn SnapshotCache>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            state,
            remote,
            objects,
            snapshot_cache,
            feedback,
        }
    }

    /// Enrolls a student.
    ///
    /// Validates the form, archives the images, appends the roster row
    /// remotely best-effort, inserts locally and persists the snapshot.
    /// Only validation and a duplicate document number can fail; every
    /// downstream problem degrades with a warning.
    pub async fn register(
        &self,
        session: &Session,
        input: RegisterStudentInput,
        now: DateTime<Utc>,
    ) -> AppResult<Student> {
        session.require(Capability::RegisterStudents)?;

        if self
            .state
            .roster()
            .find_by_document_number(input.document_number.trim())
            .await
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "document number '{}' is already registered",
                input.document_number.trim()
            )));
        }

        let id = StudentId::generate();
        let photo = self.archive_photo(&id, input.photo_data_url.as_deref()).await;
        let qr_url = self.archive_qr(&id, input.qr_data_url.as_deref()).await;

        let student = Student::new(
            id,
            input.name.trim(),
            input.document_number.trim(),
            input.course,
            input.schedule_label,
            input.email,
            input.phone,
            photo,
            qr_url,
            now,
            session.subject(),
        )?;

        if let Err(error) = self
            .remote
            .append_rows(NamedRange::Students, vec![student.to_row()])
            .await
        {
            self.feedback.notify(Feedback::new(
                FeedbackSeverity::Warning,
                "Saved locally only",
                format!("the roster row will reach the remote store on a later sync: {error}"),
            ));
        }

        self.state.roster().insert(student.clone()).await?;
        self.persist_snapshot().await;

        self.feedback.notify(Feedback::new(
            FeedbackSeverity::Success,
            "Student registered",
            student.name().to_owned(),
        ));
        Ok(student)
    }

    /// Uploads the captured photo, falling back to the inline data URL
    /// when the object store is unreachable.
    async fn archive_photo(&self, id: &StudentId, data_url: Option<&str>) -> PhotoReference {
        let Some(data_url) = data_url else {
            return PhotoReference::Missing;
        };

        let file_name = format!("photo_{id}.jpg");
        match self.objects.upload(&file_name, data_url, mime_of(data_url)).await {
            Ok(url) => PhotoReference::Url(url),
            Err(error) => {
                self.feedback.notify(Feedback::new(
                    FeedbackSeverity::Warning,
                    "Photo kept locally",
                    format!("photo upload failed, keeping the inline copy: {error}"),
                ));
                PhotoReference::Inline(data_url.to_owned())
            }
        }
    }

    /// Uploads the rendered QR image; the URL stays empty on failure, the
    /// device can always re-render the code from the student id.
    async fn archive_qr(&self, id: &StudentId, data_url: Option<&str>) -> String {
        let Some(data_url) = data_url else {
            return String::new();
        };

        let file_name = format!("qr_{id}.png");
        match self.objects.upload(&file_name, data_url, mime_of(data_url)).await {
            Ok(url) => url,
            Err(error) => {
                self.feedback.notify(Feedback::new(
                    FeedbackSeverity::Warning,
                    "QR image not archived",
                    format!("{error}"),
                ));
                String::new()
            }
        }
    }

    async fn persist_snapshot(&self) {
        let snapshot = self.state.capture_snapshot().await;
        if let Err(error) = self.snapshot_cache.store(&snapshot).await {
            self.feedback.notify(Feedback::new(
                FeedbackSeverity::Warning,
                "Local save failed",
                format!("the new student lives in memory only: {error}"),
            ));
        }
    }
}
