//! The user model and the database queries for creating, fetching, and
//! updating users.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, password::PasswordHash, policy::Role};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better
/// compile time errors, and more flexible generics that can have distinct
/// implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's email address, used to log in.
    pub email: String,
    /// The user's role, which the policy table checks operations against.
    pub role: Role,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The projection of a user that is safe to send to clients.
///
/// This is the shape returned by the users and profile APIs: no password hash
/// or other secrets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
    /// The user's email address.
    pub email: String,
    /// The user's role.
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns:
/// - [Error::DuplicateEmail] if `email` is already registered,
/// - [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    name: &str,
    email: &str,
    role: Role,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO user (name, email, role, password) VALUES (?1, ?2, ?3, ?4)",
            (name, email, role, password_hash.as_ref()),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateEmail,
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name: name.to_owned(),
        email: email.to_owned(),
        role,
        password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, role, password FROM user WHERE id = :id")?
        .query_one(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email equal to `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has this email, or [Error::SqlError]
/// on any other SQL error.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, role, password FROM user WHERE email = :email")?
        .query_one(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// List all users as client-safe projections, ordered by name ascending.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_users(connection: &Connection) -> Result<Vec<UserProfile>, Error> {
    connection
        .prepare("SELECT id, name, email, role FROM user ORDER BY name ASC")?
        .query_map([], map_user_profile_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.into())
}

/// Update a user's name and role, returning the updated projection.
///
/// Only these two fields are mutable through the users API; email and
/// password are owned by the user themselves.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not refer to an existing user,
/// or [Error::SqlError] on any other SQL error.
pub fn update_user(
    user_id: UserID,
    name: &str,
    role: Role,
    connection: &Connection,
) -> Result<UserProfile, Error> {
    connection
        .prepare(
            "UPDATE user SET name = ?1, role = ?2 WHERE id = ?3
             RETURNING id, name, email, role",
        )?
        .query_one((name, role, user_id.as_i64()), map_user_profile_row)
        .map_err(|error| error.into())
}

/// Update the caller's own name and email, returning the updated projection.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if `user_id` does not refer to an existing user,
/// - [Error::DuplicateEmail] if `email` belongs to another user,
/// - [Error::SqlError] on any other SQL error.
pub fn update_profile(
    user_id: UserID,
    name: &str,
    email: &str,
    connection: &Connection,
) -> Result<UserProfile, Error> {
    connection
        .prepare(
            "UPDATE user SET name = ?1, email = ?2 WHERE id = ?3
             RETURNING id, name, email, role",
        )?
        .query_one((name, email, user_id.as_i64()), map_user_profile_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateEmail,
            error => error.into(),
        })
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|count| count as usize)
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

fn map_user_profile_row(row: &Row) -> Result<UserProfile, rusqlite::Error> {
    Ok(UserProfile {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
    })
}
