use std::collections::HashMap;

use presentia_core::{AppError, AppResult};
use presentia_domain::{PhotoReference, Student, StudentId};
use tokio::sync::RwLock;

/// Owns the in-memory roster and answers identifier lookups.
///
/// Students are never edited in place: registration inserts, remote pulls
/// replace the whole collection.
#[derive(Debug, Default)]
pub struct RosterStore {
    students: RwLock<Vec<Student>>,
}

impl RosterStore {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a student by opaque identifier.
    pub async fn find_by_id(&self, id: &StudentId) -> Option<Student> {
        self.students
            .read()
            .await
            .iter()
            .find(|student| student.id() == id)
            .cloned()
    }

    /// Looks up a student by document (carnet) number.
    pub async fn find_by_document_number(&self, document_number: &str) -> Option<Student> {
        self.students
            .read()
            .await
            .iter()
            .find(|student| student.document_number() == document_number)
            .cloned()
    }

    /// Inserts a newly registered student.
    ///
    /// The duplicate-document check and the insert run under one write
    /// guard so two concurrent registrations cannot both pass the check.
    pub async fn insert(&self, student: Student) -> AppResult<()> {
        let mut students = self.students.write().await;

        if students
            .iter()
            .any(|existing| existing.document_number() == student.document_number())
        {
            return Err(AppError::Conflict(format!(
                "document number '{}' is already registered",
                student.document_number()
            )));
        }

        students.push(student);
        Ok(())
    }

    /// Replaces the roster wholesale from a pulled snapshot.
    ///
    /// Inline photo data often lives only in the local cache: the remote
    /// store may round-trip just a URL, or nothing. Any incoming record
    /// without inline data inherits the cached inline photo for its id so
    /// a pull never degrades what this device can still render offline.
    pub async fn replace_all(&self, incoming: Vec<Student>) {
        let mut students = self.students.write().await;

        let cached_inline: HashMap<StudentId, PhotoReference> = students
            .iter()
            .filter(|student| student.photo().is_inline())
            .map(|student| (student.id().clone(), student.photo().clone()))
            .collect();

        *students = incoming
            .into_iter()
            .map(|student| {
                if student.photo().is_inline() {
                    return student;
                }
                match cached_inline.get(student.id()) {
                    Some(inline) => student.with_photo(inline.clone()),
                    None => student,
                }
            })
            .collect();
    }

    /// Returns a copy of the full roster.
    pub async fn snapshot(&self) -> Vec<Student> {
        self.students.read().await.clone()
    }

    /// Returns the number of enrolled students.
    pub async fn len(&self) -> usize {
        self.students.read().await.len()
    }

    /// Returns whether the roster is empty.
    pub async fn is_empty(&self) -> bool {
        self.students.read().await.is_empty()
    }
}
