//! CSV exports of the report aggregations. Admin only, like the page itself.
//!
//! The filenames and row labels match what the reports page always exported:
//! `movimientos-diarios.csv` for the daily series and `ingresos-egresos.csv`
//! for the income/expense split (with Egresos negated).

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::Session,
    policy::{Action, Resource, authorize},
    timezone::get_local_offset,
    transaction::{Transaction, list_transactions_in_range},
};

use super::{
    aggregation::{RangeQuery, daily_movements, income_expense_split},
    charts::format_fecha_label,
};

/// The state needed by the report CSV exports.
#[derive(Debug, Clone)]
pub struct ReportExportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn load_range(
    state: &ReportExportState,
    query: &RangeQuery,
) -> Result<Vec<Transaction>, Error> {
    let today = match get_local_offset(&state.local_timezone) {
        Some(offset) => OffsetDateTime::now_utc().to_offset(offset).date(),
        None => OffsetDateTime::now_utc().date(),
    };
    let (start, end) = query.resolve(today);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    list_transactions_in_range(start, end, &connection)
}

fn csv_response(filename: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

fn write_csv<R: serde::Serialize>(rows: &[R]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for row in rows {
        writer
            .serialize(row)
            .map_err(|error| Error::Validation(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::Validation(error.to_string()))
}

#[derive(Debug, serde::Serialize)]
struct DailyCsvRow {
    #[serde(rename = "Fecha")]
    fecha: String,
    #[serde(rename = "Total")]
    total: f64,
}

#[derive(Debug, serde::Serialize)]
struct SplitCsvRow {
    #[serde(rename = "Categoria")]
    categoria: &'static str,
    #[serde(rename = "Monto")]
    monto: f64,
}

/// `GET /reports/daily.csv`: one row per day with the net movement, for the
/// selected date range.
pub async fn get_daily_csv(
    State(state): State<ReportExportState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RangeQuery>,
) -> Response {
    if let Err(error) = authorize(session.role, Resource::Reports, Action::Read) {
        return error.into_response();
    }

    let transactions = match load_range(&state, &query) {
        Ok(transactions) => transactions,
        Err(error) => return error.into_response(),
    };

    let rows: Vec<DailyCsvRow> = daily_movements(&transactions)
        .into_iter()
        .map(|movement| DailyCsvRow {
            fecha: format_fecha_label(movement.fecha),
            total: movement.total,
        })
        .collect();

    match write_csv(&rows) {
        Ok(body) => csv_response("movimientos-diarios.csv", body),
        Err(error) => error.into_response(),
    }
}

/// `GET /reports/split.csv`: the income/expense split for the selected date
/// range, with Egresos reported negative.
pub async fn get_split_csv(
    State(state): State<ReportExportState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RangeQuery>,
) -> Response {
    if let Err(error) = authorize(session.role, Resource::Reports, Action::Read) {
        return error.into_response();
    }

    let transactions = match load_range(&state, &query) {
        Ok(transactions) => transactions,
        Err(error) => return error.into_response(),
    };

    let split = income_expense_split(&transactions);
    let rows = vec![
        SplitCsvRow {
            categoria: "Ingresos",
            monto: split.income,
        },
        SplitCsvRow {
            categoria: "Egresos",
            monto: -split.expenses,
        },
    ];

    match write_csv(&rows) {
        Ok(body) => csv_response("ingresos-egresos.csv", body),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod export_tests {
    use time::macros::date;

    use crate::{endpoints, test_utils::spawn_test_app};

    #[tokio::test]
    async fn daily_csv_requires_admin() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .get(endpoints::REPORTS_DAILY_CSV)
            .add_cookies(cookies)
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn daily_csv_sums_per_day_with_day_first_dates() {
        let app = spawn_test_app();
        app.seed_transaction("Venta", 100.0, date!(2024 - 01 - 15));
        app.seed_transaction("Pago", -40.0, date!(2024 - 01 - 15));
        app.seed_transaction("Venta", 10.0, date!(2024 - 01 - 10));
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::REPORTS_DAILY_CSV)
            .add_query_param("start_date", "2024-01-01")
            .add_query_param("end_date", "2024-01-31")
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        assert!(
            response
                .header("content-disposition")
                .to_str()
                .unwrap()
                .contains("movimientos-diarios.csv")
        );
        let body = response.text();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Fecha,Total");
        assert_eq!(lines[1], "10/01/2024,10.0");
        assert_eq!(lines[2], "15/01/2024,60.0");
    }

    #[tokio::test]
    async fn split_csv_negates_expenses() {
        let app = spawn_test_app();
        app.seed_transaction("Venta", 1500.50, date!(2024 - 01 - 15));
        app.seed_transaction("Pago", -350.25, date!(2024 - 01 - 16));
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::REPORTS_SPLIT_CSV)
            .add_query_param("start_date", "2024-01-01")
            .add_query_param("end_date", "2024-01-31")
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let body = response.text();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "Categoria,Monto");
        assert_eq!(lines[1], "Ingresos,1500.5");
        assert_eq!(lines[2], "Egresos,-350.25");
    }

    #[tokio::test]
    async fn range_filter_excludes_out_of_range_days() {
        let app = spawn_test_app();
        app.seed_transaction("Dentro", 10.0, date!(2024 - 01 - 15));
        app.seed_transaction("Fuera", 99.0, date!(2023 - 01 - 15));
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::REPORTS_DAILY_CSV)
            .add_query_param("start_date", "2024-01-01")
            .add_query_param("end_date", "2024-01-31")
            .add_cookies(cookies)
            .await;

        let body = response.text();
        assert!(body.contains("15/01/2024"));
        assert!(!body.contains("15/01/2023"));
    }
}
