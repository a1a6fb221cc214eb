use chrono::{DateTime, Utc};
use presentia_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cell;

/// Opaque identifier for a roster entry, embedded in the student's QR code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Creates a new random student identifier.
    ///
    /// The `SID` prefix matches the identifiers already present in deployed
    /// sheets; the UUID tail makes ids from concurrent devices collision-free.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("SID{}", Uuid::new_v4().simple()))
    }

    /// Wraps an identifier exactly as decoded or stored, unvalidated.
    #[must_use]
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Where a student's photo lives, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoReference {
    /// No photo captured.
    Missing,
    /// Public URL in the binary object store.
    Url(String),
    /// Inline `data:` URL held only in the local cache.
    Inline(String),
}

impl PhotoReference {
    /// Classifies a raw sheet cell into a photo reference.
    #[must_use]
    pub fn from_cell(value: String) -> Self {
        if value.is_empty() {
            Self::Missing
        } else if value.starts_with("data:") {
            Self::Inline(value)
        } else {
            Self::Url(value)
        }
    }

    /// Returns the stored string form, empty when missing.
    #[must_use]
    pub fn as_cell(&self) -> &str {
        match self {
            Self::Missing => "",
            Self::Url(value) | Self::Inline(value) => value.as_str(),
        }
    }

    /// Returns whether this reference carries inline image data.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }
}

/// A roster entry. Created once at registration and never edited in place;
/// remote pulls replace the whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    id: StudentId,
    name: String,
    document_number: String,
    course: String,
    schedule_label: String,
    email: String,
    phone: String,
    photo: PhotoReference,
    qr_url: String,
    created_at: Option<DateTime<Utc>>,
    registered_by: String,
}

impl Student {
    /// Creates a validated roster entry for the registration flow.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        document_number: impl Into<String>,
        course: impl Into<String>,
        schedule_label: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        photo: PhotoReference,
        qr_url: impl Into<String>,
        created_at: DateTime<Utc>,
        registered_by: impl Into<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        let document_number = NonEmptyString::new(document_number)?;

        Ok(Self {
            id,
            name: name.into(),
            document_number: document_number.into(),
            course: course.into(),
            schedule_label: schedule_label.into(),
            email: email.into(),
            phone: phone.into(),
            photo,
            qr_url: qr_url.into(),
            created_at: Some(created_at),
            registered_by: registered_by.into(),
        })
    }

    /// Decodes a positional sheet row.
    ///
    /// Only the leading identifier is mandatory; every other column
    /// defaults when the row is short. An optional trailing column may
    /// carry inline photo data that never round-trips through `photo_url`.
    pub fn from_row(row: &[String]) -> AppResult<Self> {
        let id = cell(row, 0);
        if id.trim().is_empty() {
            return Err(AppError::Validation(
                "student row is missing its identifier".to_owned(),
            ));
        }

        let inline_photo = cell(row, 11);
        let photo = if inline_photo.is_empty() {
            PhotoReference::from_cell(cell(row, 7))
        } else {
            PhotoReference::Inline(inline_photo)
        };

        Ok(Self {
            id: StudentId::from_raw(id),
            name: cell(row, 1),
            document_number: cell(row, 2),
            email: cell(row, 3),
            phone: cell(row, 4),
            course: cell(row, 5),
            schedule_label: cell(row, 6),
            photo,
            qr_url: cell(row, 8),
            created_at: DateTime::parse_from_rfc3339(cell(row, 9).as_str())
                .ok()
                .map(|value| value.with_timezone(&Utc)),
            registered_by: cell(row, 10),
        })
    }

    /// Encodes the positional sheet row for this student.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        let (photo_url, inline_photo) = match &self.photo {
            PhotoReference::Missing => (String::new(), String::new()),
            PhotoReference::Url(url) => (url.clone(), String::new()),
            PhotoReference::Inline(data) => (String::new(), data.clone()),
        };

        vec![
            self.id.as_str().to_owned(),
            self.name.clone(),
            self.document_number.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.course.clone(),
            self.schedule_label.clone(),
            photo_url,
            self.qr_url.clone(),
            self.created_at
                .map(|value| value.to_rfc3339())
                .unwrap_or_default(),
            self.registered_by.clone(),
            inline_photo,
        ]
    }

    /// Returns the same student with a different photo reference.
    ///
    /// Used by the roster photo-merge when a pulled record lost the inline
    /// photo data that only the local cache still has.
    #[must_use]
    pub fn with_photo(mut self, photo: PhotoReference) -> Self {
        self.photo = photo;
        self
    }

    /// Returns the opaque identifier.
    #[must_use]
    pub fn id(&self) -> &StudentId {
        &self.id
    }

    /// Returns the full name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the national document (carnet) number.
    #[must_use]
    pub fn document_number(&self) -> &str {
        self.document_number.as_str()
    }

    /// Returns the course label.
    #[must_use]
    pub fn course(&self) -> &str {
        self.course.as_str()
    }

    /// Returns the schedule (section) label.
    #[must_use]
    pub fn schedule_label(&self) -> &str {
        self.schedule_label.as_str()
    }

    /// Returns the contact email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the contact phone number.
    #[must_use]
    pub fn phone(&self) -> &str {
        self.phone.as_str()
    }

    /// Returns the photo reference.
    #[must_use]
    pub fn photo(&self) -> &PhotoReference {
        &self.photo
    }

    /// Returns the archived QR image URL, empty when never uploaded.
    #[must_use]
    pub fn qr_url(&self) -> &str {
        self.qr_url.as_str()
    }

    /// Returns the registration timestamp when the row carried one.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the operator subject that registered this student.
    #[must_use]
    pub fn registered_by(&self) -> &str {
        self.registered_by.as_str()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{PhotoReference, Student, StudentId};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(StudentId::generate(), StudentId::generate());
    }

    #[test]
    fn full_row_round_trips() {
        let full = row(&[
            "SID1",
            "Ana Pérez",
            "1234567",
            "ana@example.com",
            "70000000",
            "3° Secundaria",
            "A",
            "https://objects.example/foto.jpg",
            "https://objects.example/qr.png",
            "2024-03-01T08:00:00+00:00",
            "operator@school.edu",
            "",
        ]);
        let student = Student::from_row(&full);
        assert!(student.is_ok());
        let student = match student {
            Ok(student) => student,
            Err(error) => panic!("row did not decode: {error}"),
        };
        assert_eq!(student.to_row(), full);
    }

    #[test]
    fn short_row_defaults_trailing_columns() {
        let student = Student::from_row(&row(&["SID2", "Luis Mamani"]));
        assert!(student.is_ok());
        let student = student.unwrap_or_else(|_| panic!("short row"));
        assert_eq!(student.name(), "Luis Mamani");
        assert_eq!(student.document_number(), "");
        assert_eq!(student.photo(), &PhotoReference::Missing);
        assert_eq!(student.created_at(), None);
    }

    #[test]
    fn row_without_identifier_is_rejected() {
        assert!(Student::from_row(&row(&["", "Sin Id"])).is_err());
        assert!(Student::from_row(&[]).is_err());
    }

    #[test]
    fn inline_photo_column_wins_over_url() {
        let student = Student::from_row(&row(&[
            "SID3",
            "Rosa Quispe",
            "7654321",
            "",
            "",
            "",
            "",
            "https://objects.example/foto.jpg",
            "",
            "",
            "",
            "data:image/jpeg;base64,abcd",
        ]));
        let student = student.unwrap_or_else(|_| panic!("row with inline photo"));
        assert_eq!(
            student.photo(),
            &PhotoReference::Inline("data:image/jpeg;base64,abcd".to_owned())
        );
    }

    #[test]
    fn data_url_in_photo_column_classifies_as_inline() {
        assert!(PhotoReference::from_cell("data:image/png;base64,xy".to_owned()).is_inline());
        assert!(!PhotoReference::from_cell("https://x".to_owned()).is_inline());
        assert_eq!(PhotoReference::from_cell(String::new()), PhotoReference::Missing);
    }

    proptest! {
        /// Any row with a non-blank identifier decodes, however short, and
        /// re-encoding never loses the identifier.
        #[test]
        fn arbitrary_short_rows_decode(tail in proptest::collection::vec("[a-z0-9 ]{0,12}", 0..11)) {
            let mut cells = vec!["SIDprop".to_owned()];
            cells.extend(tail);
            let student = Student::from_row(&cells);
            prop_assert!(student.is_ok());
            if let Ok(student) = student {
                let row = student.to_row();
                prop_assert_eq!(row[0].as_str(), "SIDprop");
            }
        }
    }
}
