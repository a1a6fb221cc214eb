use serde::{Deserialize, Serialize};

/// Sentinel recorded on rows created while no operator session exists.
pub const OFFLINE_OPERATOR: &str = "offline";

/// Operator information carried through every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorIdentity {
    subject: String,
    display_name: String,
    email: String,
}

impl OperatorIdentity {
    /// Creates an operator identity from identity-provider data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Returns an identity for rows created with no session at all.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(OFFLINE_OPERATOR, "Offline device", "")
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current operator.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email the permission list is keyed by.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}
