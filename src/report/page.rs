//! The admin reports page: current balance, a date-range filter, the two
//! charts, and links to the CSV exports.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error, endpoints,
    auth::Session,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, access_denied_page, amount_class, base, format_currency,
    },
    navigation::NavBar,
    policy::{Action, Resource, authorize},
    timezone::get_local_offset,
    transaction::list_transactions_in_range,
};

use super::{
    aggregation::{RangeQuery, current_balance, daily_movements, income_expense_split},
    charts::{ReportChart, charts_script, charts_view, daily_movement_chart, income_expense_chart},
};

/// The state needed to render the reports page.
#[derive(Debug, Clone)]
pub struct ReportsPageState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn balance_card(balance: f64) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { "Saldo Actual" }
            p class={ "text-3xl font-bold " (amount_class(balance)) }
            {
                (format_currency(balance))
            }
        }
    }
}

fn range_filter_form(start: Date, end: Date) -> Markup {
    html! {
        form method="get" action=(endpoints::REPORTS_VIEW) class="flex flex-wrap items-end gap-4 mb-4"
        {
            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "Fecha Inicio" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=(start)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "Fecha Fin" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=(end)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class={ (BUTTON_PRIMARY_STYLE) " max-w-40" } { "Apply" }
        }
    }
}

fn export_links(start: Date, end: Date) -> Markup {
    let daily_url = format!(
        "{}?start_date={start}&end_date={end}",
        endpoints::REPORTS_DAILY_CSV
    );
    let split_url = format!(
        "{}?start_date={start}&end_date={end}",
        endpoints::REPORTS_SPLIT_CSV
    );

    html! {
        div class="flex gap-4 mb-4"
        {
            a href=(daily_url) class=(LINK_STYLE) download { "Export daily movements (CSV)" }
            a href=(split_url) class=(LINK_STYLE) download { "Export income vs expenses (CSV)" }
        }
    }
}

/// Display the reports page. Non-admins get an access denied page.
pub async fn get_reports_page(
    State(state): State<ReportsPageState>,
    Extension(session): Extension<Session>,
    Query(query): Query<RangeQuery>,
) -> Response {
    if authorize(session.role, Resource::Reports, Action::Read).is_err() {
        let nav_bar = NavBar::new(endpoints::REPORTS_VIEW, session.role).into_html();
        return (StatusCode::FORBIDDEN, access_denied_page(nav_bar)).into_response();
    }

    let today = match get_local_offset(&state.local_timezone) {
        Some(offset) => OffsetDateTime::now_utc().to_offset(offset).date(),
        None => OffsetDateTime::now_utc().date(),
    };
    let (start, end) = query.resolve(today);

    // The balance card always covers the full ledger; only the charts follow
    // the selected range.
    let (all_transactions, in_range) = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        let all = match list_transactions_in_range(Date::MIN, Date::MAX, &connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        };
        let in_range = match list_transactions_in_range(start, end, &connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        };

        (all, in_range)
    };

    let balance = current_balance(&all_transactions);
    let movements = daily_movements(&in_range);
    let split = income_expense_split(&in_range);

    let charts = [
        ReportChart {
            id: "daily-movement-chart",
            options: match serde_json::to_string(&daily_movement_chart(&movements)) {
                Ok(options) => options,
                Err(error) => {
                    tracing::error!("could not serialize daily movement chart: {error}");
                    return Error::Validation(error.to_string()).into_response();
                }
            },
        },
        ReportChart {
            id: "income-expense-chart",
            options: match serde_json::to_string(&income_expense_chart(&split)) {
                Ok(options) => options,
                Err(error) => {
                    tracing::error!("could not serialize income/expense chart: {error}");
                    return Error::Validation(error.to_string()).into_response();
                }
            },
        },
    ];

    let nav_bar = NavBar::new(endpoints::REPORTS_VIEW, session.role).into_html();

    let head_elements = [
        crate::html::HeadElement::ScriptLink("/static/echarts-5.5-min.js".to_owned()),
        charts_script(&charts),
    ];

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                h1 class="text-2xl font-bold mb-4" { "Reportes" }

                div class="mb-4" { (balance_card(balance)) }

                (range_filter_form(start, end))
                (export_links(start, end))
                (charts_view(&charts))
            }
        }
    };

    base("Reportes", &head_elements, &content).into_response()
}
