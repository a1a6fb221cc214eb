//! Operator sign-in and session handling.
//!
//! Identity comes from an external provider; what the operator may do
//! comes from the permission range of the remote store. The resolved
//! session is cached locally with a TTL so a kiosk restart inside the
//! same shift does not force a new sign-in.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use presentia_core::{AppError, AppResult, OperatorIdentity};
use presentia_domain::{Capability, PermissionEntry, Role};

use crate::ports::{DocumentRangeStore, NamedRange};


/// How long a cached session stays valid without a fresh sign-in.
pub const SESSION_TTL_MINUTES: i64 = 30;

/// Port over the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Runs the interactive sign-in and returns the operator's identity.
    async fn authenticate(&self) -> AppResult<OperatorIdentity>;
}

/// Port over the durable session record.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Loads the cached session, if one exists.
    async fn load(&self) -> AppResult<Option<Session>>;

    /// Overwrites the cached session.
    async fn store(&self, session: &Session) -> AppResult<()>;

    /// Removes the cached session.
    async fn clear(&self) -> AppResult<()>;
}

/// A signed-in operator with a resolved role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    subject: String,
    display_name: String,
    email: String,
    role: Role,
    issued_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session issued now.
    #[must_use]
    pub fn new(identity: &OperatorIdentity, role: Role) -> Self {
        Self {
            subject: identity.subject().to_owned(),
            display_name: identity.display_name().to_owned(),
            email: identity.email().to_owned(),
            role,
            issued_at: Utc::now(),
        }
    }

    /// Returns whether the session has outlived its TTL at the given time.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at > Duration::minutes(SESSION_TTL_MINUTES)
    }

    /// Fails with [`AppError::Forbidden`] unless the role allows the
    /// capability.
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.role.allows(capability) {
            return Ok(());
        }
        Err(AppError::Forbidden(format!(
            "role {} may not perform this operation",
            self.role.as_str()
        )))
    }

    /// Returns the stable operator subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the sign-in email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the resolved role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

/// Application service for sign-in, session restore, and permission
/// management.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    remote: Arc<dyn DocumentRangeStore>,
    session_cache: Arc<dyn SessionCache>,
}

impl AuthService {
    /// Creates a new auth service.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        remote: Arc<dyn DocumentRangeStore>,
        session_cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            identity,
            remote,
            session_cache,
        }
    }

    /// Runs the interactive sign-in and resolves the operator's role.
    ///
    /// An empty permission range grants [`Role::Admin`]: the first person
    /// to sign in against a fresh deployment has to be able to fill the
    /// range in. Once any entry exists, an unlisted email is rejected.
    pub async fn login(&self) -> AppResult<Session> {
        let identity = self.identity.authenticate().await?;
        let entries = self.permission_entries().await?;

        let role = if entries.is_empty() {
            Role::Admin
        } else {
            entries
                .iter()
                .find(|entry| entry.matches_email(identity.email()))
                .map(PermissionEntry::role)
                .ok_or_else(|| {
                    AppError::Unauthorized(format!(
                        "'{}' is not on the permission list",
                        identity.email()
                    ))
                })?
        };

        let session = Session::new(&identity, role);
        self.session_cache.store(&session).await?;
        Ok(session)
    }

    /// Restores the cached session if one exists and is still fresh.
    ///
    /// An expired session is cleared so it is not offered again.
    pub async fn restore(&self) -> AppResult<Option<Session>> {
        let Some(session) = self.session_cache.load().await? else {
            return Ok(None);
        };
        if session.is_expired_at(Utc::now()) {
            self.session_cache.clear().await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Discards the cached session.
    pub async fn logout(&self) -> AppResult<()> {
        self.session_cache.clear().await
    }

    /// Lists the permission entries, first occurrence winning per email.
    pub async fn list_permissions(&self, session: &Session) -> AppResult<Vec<PermissionEntry>> {
        session.require(Capability::ManagePermissions)?;
        self.permission_entries().await
    }

    /// Appends a grant for an email.
    ///
    /// Appends rather than rewrites: the first entry per email wins on
    /// read, so a pre-existing grant for the same email must be removed
    /// first to change its role.
    pub async fn save_permission(
        &self,
        session: &Session,
        email: &str,
        display_name: &str,
        role: &str,
    ) -> AppResult<()> {
        session.require(Capability::ManagePermissions)?;

        let role = Role::from_str(role)?;
        let entry = PermissionEntry::new(email, display_name, role)?;
        if self
            .permission_entries()
            .await?
            .iter()
            .any(|existing| existing.matches_email(entry.email()))
        {
            return Err(AppError::Conflict(format!(
                "'{}' already has a permission entry",
                entry.email()
            )));
        }

        self.remote
            .append_rows(NamedRange::Permissions, vec![entry.to_row()])
            .await
    }

    /// Removes every grant for an email by rewriting the range without it.
    pub async fn remove_permission(&self, session: &Session, email: &str) -> AppResult<()> {
        session.require(Capability::ManagePermissions)?;

        let mut entries = self.permission_entries().await?;
        let before = entries.len();
        entries.retain(|entry| !entry.matches_email(email));
        if entries.len() == before {
            return Err(AppError::NotFound(format!(
                "no permission entry for '{email}'"
            )));
        }

        let rows = entries.iter().map(PermissionEntry::to_row).collect();
        self.remote.clear_range(NamedRange::Permissions).await?;
        self.remote
            .overwrite_range(NamedRange::Permissions, rows)
            .await
    }

    /// Reads and decodes the permission range, keeping the first entry
    /// per email. Rows without an email are dropped.
    async fn permission_entries(&self) -> AppResult<Vec<PermissionEntry>> {
        let rows = self.remote.read_range(NamedRange::Permissions).await?;

        let mut entries: Vec<PermissionEntry> = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Ok(entry) = PermissionEntry::from_row(row)
                && !entries
                    .iter()
                    .any(|existing| existing.matches_email(entry.email()))
            {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
