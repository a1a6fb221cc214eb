use std::str::FromStr;

use presentia_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::cell;

/// Operator roles recognized by the permission sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Full control, including the permission list itself.
    Admin,
    /// Registers students and operates the scanner.
    Registrar,
    /// Operates the scanner only.
    Scanner,
    /// Read-only access to reports.
    Viewer,
}

impl Role {
    /// Returns the storage string used in the permission sheet.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Registrar => "REGISTRO",
            Self::Scanner => "SCANNER",
            Self::Viewer => "VIEWER",
        }
    }

    /// Returns whether this role may perform the given operation.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManagePermissions => matches!(self, Self::Admin),
            Capability::RegisterStudents => matches!(self, Self::Admin | Self::Registrar),
            Capability::RecordAttendance => {
                matches!(self, Self::Admin | Self::Registrar | Self::Scanner)
            }
            Capability::ViewReports => {
                matches!(self, Self::Admin | Self::Registrar | Self::Viewer)
            }
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            // Both spellings appear in sheets filled in by hand.
            "REGISTRO" | "REGISTRAR" => Ok(Self::Registrar),
            "SCANNER" => Ok(Self::Scanner),
            "VIEWER" => Ok(Self::Viewer),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Gated operations an operator session may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create roster entries.
    RegisterStudents,
    /// Process scans into attendance events.
    RecordAttendance,
    /// Read attendance reports and statistics.
    ViewReports,
    /// Edit the permission sheet.
    ManagePermissions,
}

/// One row of the permission sheet, unique by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    email: String,
    display_name: String,
    role: Role,
}

impl PermissionEntry {
    /// Creates a permission entry, normalizing the email to lowercase.
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
    ) -> AppResult<Self> {
        let email = email.into().trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::Validation(
                "permission email must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            email,
            display_name: display_name.into(),
            role,
        })
    }

    /// Decodes a positional sheet row.
    ///
    /// An unknown or missing role defaults to [`Role::Viewer`], the least
    /// privileged grant, so a typo in the sheet never widens access.
    pub fn from_row(row: &[String]) -> AppResult<Self> {
        let role = cell(row, 2).parse::<Role>().unwrap_or(Role::Viewer);
        Self::new(cell(row, 0), cell(row, 1), role)
    }

    /// Encodes the positional sheet row for this entry.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.display_name.clone(),
            self.role.as_str().to_owned(),
        ]
    }

    /// Returns whether this entry grants access to the given email.
    #[must_use]
    pub fn matches_email(&self, email: &str) -> bool {
        self.email == email.trim().to_lowercase()
    }

    /// Returns the normalized email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, PermissionEntry, Role};

    #[test]
    fn role_parsing_accepts_both_registrar_spellings() {
        assert_eq!("REGISTRO".parse::<Role>().ok(), Some(Role::Registrar));
        assert_eq!("registrar".parse::<Role>().ok(), Some(Role::Registrar));
    }

    #[test]
    fn admin_allows_everything() {
        for capability in [
            Capability::RegisterStudents,
            Capability::RecordAttendance,
            Capability::ViewReports,
            Capability::ManagePermissions,
        ] {
            assert!(Role::Admin.allows(capability));
        }
    }

    #[test]
    fn scanner_only_records_attendance() {
        assert!(Role::Scanner.allows(Capability::RecordAttendance));
        assert!(!Role::Scanner.allows(Capability::RegisterStudents));
        assert!(!Role::Scanner.allows(Capability::ViewReports));
        assert!(!Role::Scanner.allows(Capability::ManagePermissions));
    }

    #[test]
    fn unknown_role_defaults_to_viewer() {
        let row = vec!["a@b.co".to_owned(), "A".to_owned(), "SUPERUSER".to_owned()];
        let entry = PermissionEntry::from_row(&row);
        assert_eq!(entry.map(|entry| entry.role()).ok(), Some(Role::Viewer));
    }

    #[test]
    fn email_matching_is_case_insensitive() {
        let entry = PermissionEntry::new("Admin@School.EDU", "Admin", Role::Admin);
        let entry = entry.unwrap_or_else(|_| panic!("valid entry"));
        assert!(entry.matches_email("admin@school.edu"));
        assert!(entry.matches_email(" ADMIN@SCHOOL.EDU "));
    }

    #[test]
    fn blank_email_is_rejected() {
        assert!(PermissionEntry::new("  ", "X", Role::Viewer).is_err());
    }
}
