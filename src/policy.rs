//! The authorization policy: roles and the table mapping operations to the role they require.
//!
//! Every handler consults [authorize] before touching the store, so the role
//! checks live in one place instead of being repeated as string comparisons
//! per handler.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The role attached to a user account.
///
/// This is a closed enumeration: the database stores the lowercase string
/// form and refuses anything else at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May manage users, create transactions, and view reports.
    Admin,
    /// May list transactions and manage their own profile.
    User,
}

impl Role {
    /// The canonical string form, as stored in the database and sent over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(Error::InvalidRole(other.to_owned())),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|text| Role::try_from(text).map_err(|_| FromSqlError::InvalidType))
    }
}

/// The resources that the policy table knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The transaction records.
    Transactions,
    /// The user accounts.
    Users,
    /// The caller's own account projection and statistics.
    Profile,
    /// The aggregate reports and their CSV exports.
    Reports,
}

/// The operations a handler may perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List all records of the resource.
    List,
    /// Create a new record.
    Create,
    /// Read a single record.
    Read,
    /// Update an existing record.
    Update,
}

/// The role required for an operation, or `None` if any valid session may
/// perform it.
///
/// Operations not listed here are treated as admin-only so that a new
/// endpoint wired up without a policy entry fails closed.
pub fn required_role(resource: Resource, action: Action) -> Option<Role> {
    match (resource, action) {
        (Resource::Transactions, Action::List) => None,
        (Resource::Transactions, Action::Create) => Some(Role::Admin),
        (Resource::Users, Action::List) => Some(Role::Admin),
        (Resource::Users, Action::Update) => Some(Role::Admin),
        (Resource::Profile, Action::Read) => None,
        (Resource::Profile, Action::Update) => None,
        (Resource::Reports, Action::Read) => Some(Role::Admin),
        _ => Some(Role::Admin),
    }
}

/// Check that `role` is sufficient for `action` on `resource`.
///
/// # Errors
///
/// Returns [Error::Forbidden] if the policy table requires a role the caller
/// does not hold. No store access happens on the deny path.
pub fn authorize(role: Role, resource: Resource, action: Action) -> Result<(), Error> {
    match required_role(resource, action) {
        None => Ok(()),
        Some(required) if role == required => Ok(()),
        Some(_) => Err(Error::Forbidden),
    }
}
