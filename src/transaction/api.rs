//! The JSON API endpoints for listing and creating transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::Session,
    policy::{Action, Resource, authorize},
    transaction::{
        NewTransaction, TransactionWithOwner,
        core::{create_transaction, get_transaction_with_owner, list_transactions_with_owner},
        validation::validate_new_transaction,
    },
};

/// The state needed by the transactions API.
#[derive(Debug, Clone)]
pub struct TransactionApiState {
    /// The database connection for reading and creating transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// `GET /api/transactions`: all transactions, newest first, each annotated
/// with its owner's name and email.
pub async fn get_transactions_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<TransactionWithOwner>>, Error> {
    authorize(session.role, Resource::Transactions, Action::List)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = list_transactions_with_owner(&connection)?;

    Ok(Json(transactions))
}

/// The request body for creating a transaction.
///
/// Every field is optional at the type level so an omitted field produces
/// the missing-fields error instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionBody {
    /// A text description of what the transaction was for.
    pub concepto: Option<String>,
    /// The signed amount: positive for income, negative for expenses.
    pub monto: Option<MontoValue>,
    /// The transaction date as "YYYY-MM-DD".
    pub fecha: Option<String>,
}

/// A monto that arrived either as a JSON number or as a numeric string.
///
/// Clients send both, so strings are coerced before validation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MontoValue {
    /// A JSON number.
    Number(f64),
    /// A numeric string such as "1500.50".
    Text(String),
}

impl MontoValue {
    fn coerce(self) -> Option<f64> {
        match self {
            MontoValue::Number(monto) => Some(monto),
            MontoValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// `POST /api/transactions` (admin only): validate the payload and create a
/// transaction owned by the session user.
pub async fn create_transaction_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
    body: Result<Json<CreateTransactionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionWithOwner>), Error> {
    authorize(session.role, Resource::Transactions, Action::Create)?;

    // A body that does not deserialize gets the same response as one with
    // fields missing.
    let Json(body) = body.map_err(|_| Error::MissingFields)?;

    let monto = body.monto.and_then(MontoValue::coerce);
    let (concepto, monto, fecha) =
        validate_new_transaction(body.concepto.as_deref(), monto, body.fecha.as_deref())?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let created = create_transaction(
        NewTransaction {
            concepto,
            monto,
            fecha,
            user_id: session.user_id,
        },
        &connection,
    )?;

    let with_owner = get_transaction_with_owner(created.id, &connection)?;

    Ok((StatusCode::CREATED, Json(with_owner)))
}

#[cfg(test)]
mod transactions_api_tests {
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{TestApp, spawn_test_app},
        transaction::count_transactions,
    };

    #[tokio::test]
    async fn list_requires_a_session() {
        let TestApp { server, .. } = spawn_test_app();

        let response = server.get(endpoints::TRANSACTIONS_API).await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({"message": "Unauthorized"}));
    }

    #[tokio::test]
    async fn create_requires_a_session_and_writes_nothing() {
        let app = spawn_test_app();

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .json(&json!({"concepto": "Venta", "monto": 1.0, "fecha": "2024-01-15"}))
            .await;

        response.assert_status_unauthorized();
        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn admin_creates_and_lists_transaction() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies.clone())
            .json(&json!({
                "concepto": "Venta de productos",
                "monto": 1500.50,
                "fecha": "2024-01-15",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let created: serde_json::Value = response.json();
        assert_eq!(created["concepto"], "Venta de productos");
        assert_eq!(created["monto"], 1500.50);
        assert_eq!(created["fecha"], "2024-01-15");
        assert_eq!(created["user"]["email"], "admin@example.com");

        let response = app
            .server
            .get(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let listed: Vec<serde_json::Value> = response.json();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn created_transaction_lists_first_under_descending_date_order() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        for (concepto, fecha) in [("Older", "2024-01-10"), ("Newest", "2024-01-15")] {
            app.server
                .post(endpoints::TRANSACTIONS_API)
                .add_cookies(cookies.clone())
                .json(&json!({"concepto": concepto, "monto": 1.0, "fecha": fecha}))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let listed: Vec<serde_json::Value> = app
            .server
            .get(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .await
            .json();

        assert_eq!(listed[0]["concepto"], "Newest");
        assert_eq!(listed[1]["concepto"], "Older");
    }

    #[tokio::test]
    async fn non_admin_create_is_forbidden_and_list_unchanged() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies.clone())
            .json(&json!({
                "concepto": "Venta de productos",
                "monto": 1500.50,
                "fecha": "2024-01-15",
            }))
            .await;

        response.assert_status_forbidden();
        response.assert_json(&json!({"message": "Forbidden: Admin access required"}));

        let listed: Vec<serde_json::Value> = app
            .server
            .get(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .await
            .json();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn non_admin_may_list_transactions() {
        let app = spawn_test_app();
        let admin_cookies = app.log_in_admin().await;
        app.server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(admin_cookies)
            .json(&json!({"concepto": "Venta", "monto": 5.0, "fecha": "2024-01-15"}))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let user_cookies = app.log_in_user().await;
        let response = app
            .server
            .get(endpoints::TRANSACTIONS_API)
            .add_cookies(user_cookies)
            .await;

        response.assert_status_ok();
        let listed: Vec<serde_json::Value> = response.json();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_get_bad_request() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .json(&json!({"concepto": "Venta de productos"}))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "Missing required fields"}));
    }

    #[tokio::test]
    async fn zero_monto_is_rejected_before_the_store() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .json(&json!({"concepto": "Venta", "monto": 0, "fecha": "2024-01-15"}))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "El monto no puede ser cero"}));

        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn string_monto_is_coerced_to_a_number() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .json(&json!({"concepto": "Venta", "monto": "1500.50", "fecha": "2024-01-15"}))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let created: serde_json::Value = response.json();
        assert_eq!(created["monto"], 1500.50);
    }

    #[tokio::test]
    async fn store_failure_during_creation_gets_generic_500() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        // Make the single store call fail without touching the handler.
        {
            let connection = app.state.db_connection.lock().unwrap();
            connection
                .execute_batch("DROP TABLE \"transaction\";")
                .unwrap();
        }

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .json(&json!({
                "concepto": "Venta de productos",
                "monto": 1500.50,
                "fecha": "2024-01-15",
            }))
            .await;

        response.assert_status_internal_server_error();
        response.assert_json(&json!({"message": "Internal server error"}));
    }

    #[tokio::test]
    async fn wrong_method_gets_405() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .put(endpoints::TRANSACTIONS_API)
            .add_cookies(cookies)
            .json(&json!({}))
            .await;

        response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
    }
}
