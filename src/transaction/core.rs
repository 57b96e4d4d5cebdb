//! The transaction model and its database queries.
//!
//! A transaction is a signed monetary record: positive `monto` is income,
//! negative is an expense. Every transaction belongs to exactly one user,
//! fixed at creation time.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::TransactionId, user::UserID};

/// An income or expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub concepto: String,
    /// The signed amount: positive for income, negative for expenses.
    pub monto: f64,
    /// When the transaction happened.
    pub fecha: Date,
    /// The ID of the user who created the transaction.
    #[serde(rename = "userId")]
    pub user_id: UserID,
}

/// The owner fields that annotate a transaction in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOwner {
    /// The owning user's display name.
    pub name: String,
    /// The owning user's email address.
    pub email: String,
}

/// A transaction annotated with its owner's name and email, the shape the
/// transactions API returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionWithOwner {
    /// The transaction record itself.
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The owning user's name and email.
    pub user: TransactionOwner,
}

/// The fields needed to create a transaction. The owner is always the
/// session user of the request that created it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A text description of what the transaction was for.
    pub concepto: String,
    /// The signed amount. Zero is rejected by validation before this struct
    /// is constructed.
    pub monto: f64,
    /// When the transaction happened.
    pub fecha: Date,
    /// The creating user.
    pub user_id: UserID,
}

/// Create the transaction table in the database.
///
/// # Errors
///
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                concepto TEXT NOT NULL,
                monto REAL NOT NULL,
                fecha TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id)
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('transaction', 0)",
        (),
    )?;

    // Index used by the list and report queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_fecha ON \"transaction\"(fecha);",
        (),
    )?;

    Ok(())
}

/// Create a new transaction in the database.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if the owning user does not exist,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "INSERT INTO \"transaction\" (concepto, monto, fecha, user_id)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, concepto, monto, fecha, user_id",
        )?
        .query_one(
            (
                &new_transaction.concepto,
                new_transaction.monto,
                new_transaction.fecha,
                new_transaction.user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Retrieve a transaction with its owner annotation by its `id`.
///
/// # Errors
///
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transaction_with_owner(
    id: TransactionId,
    connection: &Connection,
) -> Result<TransactionWithOwner, Error> {
    connection
        .prepare(
            "SELECT t.id, t.concepto, t.monto, t.fecha, t.user_id, u.name, u.email
             FROM \"transaction\" t JOIN user u ON u.id = t.user_id
             WHERE t.id = :id",
        )?
        .query_one(&[(":id", &id)], map_transaction_with_owner_row)
        .map_err(|error| error.into())
}

/// List all transactions annotated with their owner's name and email,
/// ordered by date descending. Transactions on the same date keep their
/// arrival order.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions_with_owner(
    connection: &Connection,
) -> Result<Vec<TransactionWithOwner>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.concepto, t.monto, t.fecha, t.user_id, u.name, u.email
             FROM \"transaction\" t JOIN user u ON u.id = t.user_id
             ORDER BY t.fecha DESC, t.id ASC",
        )?
        .query_map([], map_transaction_with_owner_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.into())
}

/// List the transactions dated within `[start, end]` (inclusive), ordered by
/// date ascending for aggregation.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_transactions_in_range(
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, concepto, monto, fecha, user_id FROM \"transaction\"
             WHERE fecha >= :start AND fecha <= :end
             ORDER BY fecha ASC, id ASC",
        )?
        .query_map(&[(":start", &start), (":end", &end)], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.into())
}

/// The derived statistics shown on the profile page: how many transactions
/// the user owns and their signed sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatistics {
    /// The number of transactions owned by the user.
    #[serde(rename = "transactionCount")]
    pub transaction_count: i64,
    /// The signed sum of the user's transaction amounts.
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
}

/// Count and sum the transactions owned by `user_id`.
///
/// A user with no transactions gets a zero count and a zero total.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_user_statistics(
    user_id: UserID,
    connection: &Connection,
) -> Result<TransactionStatistics, Error> {
    connection
        .query_row(
            "SELECT COUNT(id), COALESCE(SUM(monto), 0.0) FROM \"transaction\"
             WHERE user_id = :id",
            &[(":id", &user_id.as_i64())],
            |row| {
                Ok(TransactionStatistics {
                    transaction_count: row.get(0)?,
                    total_amount: row.get(1)?,
                })
            },
        )
        .map_err(|error| error.into())
}

/// Get the total number of transactions in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        concepto: row.get(1)?,
        monto: row.get(2)?,
        fecha: row.get(3)?,
        user_id: UserID::new(row.get(4)?),
    })
}

fn map_transaction_with_owner_row(row: &Row) -> Result<TransactionWithOwner, rusqlite::Error> {
    Ok(TransactionWithOwner {
        transaction: Transaction {
            id: row.get(0)?,
            concepto: row.get(1)?,
            monto: row.get(2)?,
            fecha: row.get(3)?,
            user_id: UserID::new(row.get(4)?),
        },
        user: TransactionOwner {
            name: row.get(5)?,
            email: row.get(6)?,
        },
    })
}

#[cfg(test)]
mod transaction_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        password::PasswordHash,
        policy::Role,
        user::{UserID, create_user},
    };

    use super::{
        NewTransaction, count_transactions, create_transaction, get_transaction_with_owner,
        get_user_statistics, list_transactions_in_range, list_transactions_with_owner,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn seed_user(conn: &Connection) -> UserID {
        create_user(
            "Admin User",
            "admin@example.com",
            Role::Admin,
            PasswordHash::new_unchecked("hunter2"),
            conn,
        )
        .unwrap()
        .id
    }

    fn new_transaction(concepto: &str, monto: f64, fecha: time::Date, user_id: UserID) -> NewTransaction {
        NewTransaction {
            concepto: concepto.to_owned(),
            monto,
            fecha,
            user_id,
        }
    }

    #[test]
    fn create_transaction_assigns_id_and_owner() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);

        let transaction = create_transaction(
            new_transaction("Venta de productos", 1500.50, date!(2024 - 01 - 15), user_id),
            &conn,
        )
        .unwrap();

        assert_eq!(transaction.id, 1);
        assert_eq!(transaction.user_id, user_id);
        assert_eq!(transaction.monto, 1500.50);
    }

    #[test]
    fn create_transaction_with_unknown_user_fails() {
        let conn = get_test_connection();

        let result = create_transaction(
            new_transaction("Venta", 10.0, date!(2024 - 01 - 15), UserID::new(42)),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn list_orders_by_date_descending_with_arrival_order_ties() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);
        create_transaction(
            new_transaction("Older", 10.0, date!(2024 - 01 - 10), user_id),
            &conn,
        )
        .unwrap();
        create_transaction(
            new_transaction("Tie first", 20.0, date!(2024 - 01 - 15), user_id),
            &conn,
        )
        .unwrap();
        create_transaction(
            new_transaction("Tie second", 30.0, date!(2024 - 01 - 15), user_id),
            &conn,
        )
        .unwrap();

        let transactions = list_transactions_with_owner(&conn).unwrap();

        let conceptos: Vec<&str> = transactions
            .iter()
            .map(|t| t.transaction.concepto.as_str())
            .collect();
        assert_eq!(conceptos, vec!["Tie first", "Tie second", "Older"]);
    }

    #[test]
    fn list_annotates_owner_name_and_email() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);
        create_transaction(
            new_transaction("Venta de productos", 1500.50, date!(2024 - 01 - 15), user_id),
            &conn,
        )
        .unwrap();

        let transactions = list_transactions_with_owner(&conn).unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].user.name, "Admin User");
        assert_eq!(transactions[0].user.email, "admin@example.com");
    }

    #[test]
    fn get_with_owner_round_trips() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);
        let created = create_transaction(
            new_transaction("Venta", 25.0, date!(2024 - 02 - 01), user_id),
            &conn,
        )
        .unwrap();

        let fetched = get_transaction_with_owner(created.id, &conn).unwrap();

        assert_eq!(fetched.transaction, created);
    }

    #[test]
    fn range_query_is_inclusive() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);
        for (concepto, fecha) in [
            ("before", date!(2024 - 01 - 01)),
            ("start", date!(2024 - 01 - 10)),
            ("end", date!(2024 - 01 - 20)),
            ("after", date!(2024 - 02 - 01)),
        ] {
            create_transaction(new_transaction(concepto, 1.0, fecha, user_id), &conn).unwrap();
        }

        let in_range =
            list_transactions_in_range(date!(2024 - 01 - 10), date!(2024 - 01 - 20), &conn)
                .unwrap();

        let conceptos: Vec<&str> = in_range.iter().map(|t| t.concepto.as_str()).collect();
        assert_eq!(conceptos, vec!["start", "end"]);
    }

    #[test]
    fn statistics_count_and_sum_only_own_transactions() {
        let conn = get_test_connection();
        let owner = seed_user(&conn);
        let other = create_user(
            "User 1",
            "user1@example.com",
            Role::User,
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap()
        .id;
        create_transaction(new_transaction("Venta", 100.0, date!(2024 - 01 - 01), owner), &conn)
            .unwrap();
        create_transaction(new_transaction("Pago", -40.0, date!(2024 - 01 - 02), owner), &conn)
            .unwrap();

        let stats = get_user_statistics(owner, &conn).unwrap();
        assert_eq!(stats.transaction_count, 2);
        assert_eq!(stats.total_amount, 60.0);

        let empty_stats = get_user_statistics(other, &conn).unwrap();
        assert_eq!(empty_stats.transaction_count, 0);
        assert_eq!(empty_stats.total_amount, 0.0);
    }

    #[test]
    fn count_tracks_insertions() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);

        assert_eq!(count_transactions(&conn).unwrap(), 0);

        create_transaction(new_transaction("Venta", 1.0, date!(2024 - 01 - 01), user_id), &conn)
            .unwrap();

        assert_eq!(count_transactions(&conn).unwrap(), 1);
    }

    #[test]
    fn serializes_with_owner_annotation_and_camel_case_user_id() {
        let conn = get_test_connection();
        let user_id = seed_user(&conn);
        create_transaction(
            new_transaction("Venta de productos", 1500.50, date!(2024 - 01 - 15), user_id),
            &conn,
        )
        .unwrap();

        let transactions = list_transactions_with_owner(&conn).unwrap();
        let as_json = serde_json::to_value(&transactions).unwrap();

        assert_eq!(as_json[0]["concepto"], "Venta de productos");
        assert_eq!(as_json[0]["monto"], 1500.50);
        assert_eq!(as_json[0]["fecha"], "2024-01-15");
        assert_eq!(as_json[0]["userId"], user_id.as_i64());
        assert_eq!(as_json[0]["user"]["email"], "admin@example.com");
    }
}
