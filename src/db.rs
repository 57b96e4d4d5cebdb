//! Database initialization for the application's domain models.

use rusqlite::Connection;

use crate::{transaction::create_transaction_table, user::create_user_table};

/// Create the application tables if they do not exist.
///
/// Safe to call on every start-up: all statements are `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if any of the SQL queries failed.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Transactions reference their owning user; SQLite only enforces this
    // when the pragma is on.
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    create_user_table(connection)?;
    create_transaction_table(connection)?;

    Ok(())
}
