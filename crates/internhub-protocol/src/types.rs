//! Core record types exchanged with the identity and realtime backends.
//!
//! Records here are the backend's view of the world. The session layer
//! never exposes a [`UserRecord`] to the UI directly; it maps it into an
//! account projection first.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an account, as issued by the identity service.
///
/// Newtype wrapper so an account id can't be confused with an email or
/// any other string. `#[serde(transparent)]` keeps it a bare string on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Creates an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The dashboard role an account holds.
///
/// The wire names are the backend's: `"admin"`, `"supervisor"`,
/// `"intern"`. `"administrator"` is accepted as an alias on input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "admin", alias = "administrator")]
    Administrator,
    Supervisor,
    Intern,
}

impl Role {
    /// All roles, in privilege order (highest first).
    pub const ALL: [Role; 3] =
        [Role::Administrator, Role::Supervisor, Role::Intern];

    /// The backend's name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "admin",
            Role::Supervisor => "supervisor",
            Role::Intern => "intern",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, whitespace-tolerant parse.
impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Administrator),
            "supervisor" => Ok(Role::Supervisor),
            "intern" => Ok(Role::Intern),
            _ => Err(ProtocolError::UnknownRole(s.to_string())),
        }
    }
}

/// Lifecycle status of an account.
///
/// Only `Archived` has meaning to the session layer: an archived account
/// must never stay signed in. Unknown statuses are tolerated as `Other`
/// so a new backend status can't break decoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Archived,
    #[serde(other)]
    Other,
}

impl AccountStatus {
    /// Returns `true` for deactivated accounts.
    pub fn is_archived(&self) -> bool {
        matches!(self, AccountStatus::Archived)
    }
}

/// An account as the identity service returns it.
///
/// `role` is kept as the raw backend string; mapping (with its fallback)
/// happens in the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: AccountId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserRecord {
    /// Creates an active record with no name, role, or avatar.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            email: email.into(),
            full_name: None,
            role: None,
            status: AccountStatus::Active,
            avatar_url: None,
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// The profile row the dashboard keeps per account.
///
/// Fetched by the background deactivation check; only `status` is
/// consulted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: AccountId,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl ProfileRecord {
    pub fn new(id: impl Into<String>, status: AccountStatus) -> Self {
        Self {
            id: AccountId::new(id),
            status,
            role: None,
            full_name: None,
        }
    }
}

/// Profile data submitted with a registration.
///
/// `onboarding` carries the role-specific fields the sign-up form
/// collects (university and graduation year for interns, department for
/// supervisors, and so on). A `BTreeMap` keeps the serialized order
/// stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub onboarding: BTreeMap<String, String>,
}

impl SignUpMetadata {
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            full_name: full_name.into(),
            role,
            onboarding: BTreeMap::new(),
        }
    }

    /// Adds one onboarding field.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.onboarding.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Realtime types
// ---------------------------------------------------------------------------

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A change notification for a named collection.
///
/// Deliberately carries no row data: consumers re-fetch instead of
/// diffing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(collection: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            collection: collection.into(),
            kind,
        }
    }
}
