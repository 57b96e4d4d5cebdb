//! Finanzas is a small web app for tracking shared income and expenses.
//!
//! Authenticated users browse the transaction ledger and manage their own
//! profile, while administrators record transactions, manage user roles, and
//! view aggregate reports.
//!
//! The library exposes a REST-style JSON API under `/api` and serves the HTML
//! pages directly.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod html;
mod logging;
mod navigation;
mod password;
mod policy;
mod profile;
mod report;
mod routing;
#[cfg(test)]
mod test_utils;
mod timezone;
mod transaction;
mod user;

pub use app_state::AppState;
pub use auth::Session;
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use policy::Role;
pub use routing::build_router;
pub use user::{User, UserID, create_user, get_user_by_id};

use crate::alert::Alert;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request carried no valid session.
    #[error("the request is not authenticated")]
    Unauthenticated,

    /// The session is valid but the caller's role does not permit the
    /// operation.
    #[error("the caller's role does not permit this operation")]
    Forbidden,

    /// The request body is missing one or more required fields.
    #[error("the request is missing required fields")]
    MissingFields,

    /// A field was present but failed validation. The string is shown to the
    /// client verbatim.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A role string that is not part of the closed role enumeration.
    #[error("{0} is not a valid role")]
    InvalidRole(String),

    /// The user provided an invalid email and password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email address is already registered to another account.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The user record referenced by the request does not exist.
    #[error("the user could not be found")]
    UserNotFound,

    /// An error occurred while getting the local timezone from a canonical
    /// timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated
            | Error::InvalidCredentials
            | Error::CookieMissing
            | Error::InvalidDateFormat(_, _) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::MissingFields
            | Error::Validation(_)
            | Error::InvalidRole(_)
            | Error::DuplicateEmail
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::NotFound | Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::HashingError(_)
            | Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to clients for this error.
    ///
    /// Internal errors all collapse to a generic message so that store
    /// details never leak; the specifics are logged server-side instead.
    pub fn client_message(&self) -> String {
        match self {
            Error::Unauthenticated | Error::CookieMissing | Error::InvalidDateFormat(_, _) => {
                "Unauthorized".to_owned()
            }
            Error::Forbidden => "Forbidden: Admin access required".to_owned(),
            Error::MissingFields => "Missing required fields".to_owned(),
            Error::Validation(message) => message.clone(),
            Error::InvalidRole(_) => "Invalid role".to_owned(),
            Error::InvalidCredentials => "Invalid email or password".to_owned(),
            Error::DuplicateEmail => "User already registered".to_owned(),
            Error::TooWeak(feedback) => format!("Password is too weak: {feedback}"),
            Error::NotFound => "Not found".to_owned(),
            Error::UserNotFound => "User not found".to_owned(),
            Error::HashingError(_)
            | Error::InvalidTimezoneError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => "Internal server error".to_owned(),
        }
    }

    /// Render this error as an htmx alert fragment for form endpoints.
    ///
    /// The status code matches the JSON API mapping so the `response-targets`
    /// extension can route the fragment to the form's error region.
    pub(crate) fn into_alert_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status,
            Alert::Error {
                message: self.client_message(),
            },
        )
            .into_response()
    }
}

// The JSON API error surface: every error becomes `{"message": "..."}` with
// the status from the taxonomy.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (status, Json(json!({ "message": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::http::StatusCode;

    use super::Error;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::MissingFields.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::DatabaseLockError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert_eq!(error.client_message(), "Internal server error");
    }

    #[test]
    fn query_returned_no_rows_folds_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
