//! The transactions page: a table of all transactions, newest first, with a
//! create dialog for admins.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of rejecting like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    AppState, Error, endpoints,
    auth::Session,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, amount_class,
        base, format_currency, loading_spinner,
    },
    navigation::NavBar,
    policy::{Action, Resource, authorize},
    timezone::get_local_offset,
    transaction::{
        NewTransaction, TransactionWithOwner,
        core::{create_transaction, list_transactions_with_owner},
        validation::validate_new_transaction,
    },
};

/// The max number of graphemes to display in the concepto column before
/// truncating and displaying ellipses.
const MAX_CONCEPTO_GRAPHEMES: usize = 32;

/// The state needed to render the transactions page and handle the create
/// dialog form.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The database connection for reading and creating transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The state of the create dialog.
///
/// `Submitting` exists only client-side as htmx's in-flight indicator, so the
/// server renders the remaining three states: the page renders `Closed`, and
/// a failed submission renders `Error` so the dialog reopens with the message
/// next to the form.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DialogState {
    /// The dialog is present but hidden; only the trigger button shows.
    Closed,
    /// The dialog is open with an empty form.
    Open,
    /// The dialog is open and displays an error message near the form.
    Error(String),
}

fn truncate_concepto(concepto: &str) -> String {
    let graphemes: Vec<&str> = concepto.graphemes(true).collect();

    if graphemes.len() <= MAX_CONCEPTO_GRAPHEMES {
        concepto.to_owned()
    } else {
        format!("{}…", graphemes[..MAX_CONCEPTO_GRAPHEMES].concat())
    }
}

fn transactions_table(transactions: &[TransactionWithOwner]) -> Markup {
    html! {
        div class="relative overflow-x-auto shadow-md sm:rounded-lg w-full"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Concepto" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Recorded by" }
                    }
                }

                tbody
                {
                    @if transactions.is_empty()
                    {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="4" class=(TABLE_CELL_STYLE) { "No transactions yet." }
                        }
                    }

                    @for row in transactions
                    {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (row.transaction.fecha) }
                            td class=(TABLE_CELL_STYLE) { (truncate_concepto(&row.transaction.concepto)) }
                            td class={ (TABLE_CELL_STYLE) " " (amount_class(row.transaction.monto)) }
                            {
                                (format_currency(row.transaction.monto))
                            }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (row.user.name)
                                span class="block text-xs text-gray-400" { (row.user.email) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Render the create dialog and its trigger button.
///
/// The form posts to the create endpoint; on failure the alert fragment is
/// swapped into the dialog's alert region, on success the whole page is
/// redirected so the table refetches.
fn create_transaction_dialog(state: &DialogState, default_fecha: Date) -> Markup {
    let error_message = match state {
        DialogState::Error(message) => Some(message.as_str()),
        _ => None,
    };

    html! {
        button
            type="button"
            class="px-4 py-2 mb-4 bg-blue-500 dark:bg-blue-600 hover:bg-blue-600 hover:dark:bg-blue-700 text-white rounded"
            onclick="document.getElementById('new-transaction-dialog').showModal()"
        {
            "New transaction"
        }

        dialog
            id="new-transaction-dialog"
            class="rounded-lg p-6 w-full max-w-md bg-white dark:bg-gray-800 text-gray-900 dark:text-white"
            open[*state != DialogState::Closed]
        {
            h2 class="text-xl font-bold mb-4" { "New transaction" }

            div id="new-transaction-alert"
            {
                @if let Some(message) = error_message
                {
                    div class="p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400" role="alert"
                    {
                        span class="font-medium" { (message) }
                    }
                }
            }

            form
                hx-post=(endpoints::NEW_TRANSACTION)
                hx-target-error="#new-transaction-alert"
                hx-swap="innerHTML"
                hx-indicator="#indicator"
                class="space-y-4"
            {
                div
                {
                    label for="concepto" class=(FORM_LABEL_STYLE) { "Concepto" }
                    input
                        type="text"
                        name="concepto"
                        id="concepto"
                        class=(FORM_TEXT_INPUT_STYLE)
                        minlength="3"
                        maxlength="100"
                        required;
                }

                div
                {
                    label for="monto" class=(FORM_LABEL_STYLE) { "Monto" }
                    input
                        type="number"
                        name="monto"
                        id="monto"
                        step="0.01"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                    p class="text-xs text-gray-500 dark:text-gray-400"
                    {
                        "Positive for income, negative for expenses."
                    }
                }

                div
                {
                    label for="fecha" class=(FORM_LABEL_STYLE) { "Fecha" }
                    input
                        type="date"
                        name="fecha"
                        id="fecha"
                        value=(default_fecha)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div class="flex gap-2"
                {
                    button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                        "Create"
                    }

                    button
                        type="button"
                        class=(BUTTON_SECONDARY_STYLE)
                        onclick="document.getElementById('new-transaction-dialog').close()"
                    {
                        "Cancel"
                    }
                }
            }
        }
    }
}

/// The query parameters accepted by the transactions page.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsPageQuery {
    /// Present when the create dialog should start open, e.g. "/transactions?new=1".
    pub new: Option<String>,
}

/// Display the transactions page.
///
/// Admins also get the create dialog; everyone else only sees the table.
/// `?new=1` opens the create dialog on load.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TransactionsPageQuery>,
) -> Response {
    let transactions = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match list_transactions_with_owner(&connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        }
    };

    let today = match get_local_offset(&state.local_timezone) {
        Some(offset) => OffsetDateTime::now_utc().to_offset(offset).date(),
        None => OffsetDateTime::now_utc().date(),
    };

    let can_create = authorize(session.role, Resource::Transactions, Action::Create).is_ok();
    let dialog_state = if query.new.is_some() {
        DialogState::Open
    } else {
        DialogState::Closed
    };
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW, session.role).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl"
            {
                h1 class="text-2xl font-bold mb-4" { "Transactions" }

                @if can_create
                {
                    (create_transaction_dialog(&dialog_state, today))
                }

                (transactions_table(&transactions))
            }
        }
    };

    base("Transactions", &[], &content).into_response()
}

/// The form data from the create dialog.
#[derive(Debug, Deserialize)]
pub struct NewTransactionForm {
    /// A text description of what the transaction was for.
    pub concepto: Option<String>,
    /// The signed amount.
    pub monto: Option<f64>,
    /// The transaction date as "YYYY-MM-DD".
    pub fecha: Option<String>,
}

/// Handle the create dialog form: validate, create, redirect back to the
/// transactions page.
///
/// Failures return an alert fragment and leave the dialog's form state
/// untouched on the client.
pub async fn post_new_transaction(
    State(state): State<TransactionsPageState>,
    Extension(session): Extension<Session>,
    Form(form): Form<NewTransactionForm>,
) -> Response {
    if let Err(error) = authorize(session.role, Resource::Transactions, Action::Create) {
        return error.into_alert_response();
    }

    let (concepto, monto, fecha) =
        match validate_new_transaction(form.concepto.as_deref(), form.monto, form.fecha.as_deref())
        {
            Ok(validated) => validated,
            Err(error) => return error.into_alert_response(),
        };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = create_transaction(
        NewTransaction {
            concepto,
            monto,
            fecha,
            user_id: session.user_id,
        },
        &connection,
    ) {
        tracing::error!("could not create transaction: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod transactions_page_tests {
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{parse_html_document, parse_html_fragment, sample_date, spawn_test_app},
        transaction::count_transactions,
    };

    use super::{DialogState, create_transaction_dialog, truncate_concepto};

    #[test]
    fn truncates_long_conceptos() {
        let concepto = "a".repeat(50);

        let truncated = truncate_concepto(&concepto);

        assert!(truncated.chars().count() <= 33);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn short_conceptos_are_untouched() {
        assert_eq!(truncate_concepto("Venta"), "Venta");
    }

    #[test]
    fn dialog_error_state_renders_message_and_opens() {
        let markup = create_transaction_dialog(
            &DialogState::Error("El monto no puede ser cero".to_owned()),
            sample_date(),
        )
        .into_string();

        assert!(markup.contains("El monto no puede ser cero"));
        assert!(markup.contains("open"));
    }

    #[test]
    fn dialog_closed_state_has_no_open_attribute() {
        let markup =
            create_transaction_dialog(&DialogState::Closed, sample_date()).into_string();

        let document = parse_html_fragment(&markup);
        let dialog = document
            .select(&Selector::parse("dialog").unwrap())
            .next()
            .expect("expected a dialog element");
        assert!(dialog.value().attr("open").is_none());
    }

    #[tokio::test]
    async fn admin_page_shows_create_dialog_and_rows() {
        let app = spawn_test_app();
        app.seed_transaction("Venta de productos", 1500.50, sample_date());
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let document = parse_html_document(&response.text());
        assert!(
            document
                .select(&Selector::parse("dialog#new-transaction-dialog").unwrap())
                .next()
                .is_some(),
            "expected the create dialog on the admin page"
        );
        let rows: Vec<_> = document
            .select(&Selector::parse("tbody tr").unwrap())
            .collect();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn regular_user_page_has_no_create_dialog() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let document = parse_html_document(&response.text());
        assert!(
            document
                .select(&Selector::parse("dialog#new-transaction-dialog").unwrap())
                .next()
                .is_none(),
            "expected no create dialog for a regular user"
        );
    }

    #[tokio::test]
    async fn new_query_param_opens_the_dialog() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::TRANSACTIONS_VIEW)
            .add_query_param("new", "1")
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let document = parse_html_document(&response.text());
        let dialog = document
            .select(&Selector::parse("dialog#new-transaction-dialog").unwrap())
            .next()
            .expect("expected the create dialog");
        assert!(dialog.value().attr("open").is_some());
    }

    #[tokio::test]
    async fn create_form_success_redirects_to_transactions() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::NEW_TRANSACTION)
            .add_cookies(cookies)
            .form(&[
                ("concepto", "Venta de productos"),
                ("monto", "1500.50"),
                ("fecha", "2024-01-15"),
            ])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::TRANSACTIONS_VIEW);

        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 1);
    }

    #[tokio::test]
    async fn create_form_with_zero_monto_returns_alert_and_writes_nothing() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .post(endpoints::NEW_TRANSACTION)
            .add_cookies(cookies)
            .form(&[
                ("concepto", "Venta de productos"),
                ("monto", "0"),
                ("fecha", "2024-01-15"),
            ])
            .await;

        response.assert_status_bad_request();
        assert!(response.text().contains("El monto no puede ser cero"));

        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn create_form_as_regular_user_is_forbidden() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .post(endpoints::NEW_TRANSACTION)
            .add_cookies(cookies)
            .form(&[
                ("concepto", "Venta de productos"),
                ("monto", "1500.50"),
                ("fecha", "2024-01-15"),
            ])
            .await;

        response.assert_status_forbidden();
        assert!(response.text().contains("Forbidden: Admin access required"));

        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn unauthenticated_form_post_gets_hx_redirect_to_log_in() {
        let app = spawn_test_app();

        let response = app
            .server
            .post(endpoints::NEW_TRANSACTION)
            .form(&[
                ("concepto", "Venta de productos"),
                ("monto", "1500.50"),
                ("fecha", "2024-01-15"),
            ])
            .await;

        response.assert_status_ok();
        assert!(
            response
                .header("hx-redirect")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW),
            "expected an HX-Redirect to the log-in page"
        );

        let connection = app.state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }
}
