//! The log-in page and the handler for log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error, endpoints,
    auth::{invalidate_auth_cookie, redirect::parse_redirect_url, set_auth_cookie},
    html::{BUTTON_PRIMARY_STYLE, auth_card, base, loading_spinner, password_input, text_input},
    user::get_user_by_email,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid email or password";

fn log_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("email", "Email", "email", email, None))
            (password_input("password", "Password", error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a
                    href=(endpoints::SIGN_UP_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Sign up here"
                }
            }
        }
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    /// The page to return to after logging in.
    pub redirect_url: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = auth_card("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up the user by email.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The form data for a log-in request.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The email of the account to log into.
    pub email: String,
    /// The password for the account.
    pub password: String,
    /// Present when the user ticked "remember me".
    pub remember_me: Option<String>,
    /// The page to return to after logging in.
    pub redirect_url: Option<String>,
}

/// Verify the user's credentials, set the auth cookie, and redirect to the
/// page they came from (or the dashboard).
///
/// Invalid credentials re-render the form with an error message and do not
/// reveal whether the email or the password was wrong.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return log_in_form(
                    &user_data.email,
                    Some("An internal error occurred. Please try again later."),
                    redirect_url,
                )
                .into_response();
            }
        };

        match get_user_by_email(&user_data.email, &connection) {
            Ok(user) => Some(user),
            Err(Error::NotFound) => None,
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return log_in_form(
                    &user_data.email,
                    Some("An internal error occurred. Please try again later."),
                    redirect_url,
                )
                .into_response();
            }
        }
    };

    // Verify against a missing user the same way as a wrong password so the
    // response does not leak which emails are registered.
    let credentials_valid = match &user {
        Some(user) => match user.password_hash.verify(&user_data.password) {
            Ok(()) => true,
            Err(Error::InvalidCredentials) => false,
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                false
            }
        },
        None => false,
    };

    let Some(user) = user.filter(|_| credentials_valid) else {
        return log_in_form(
            &user_data.email,
            Some(INVALID_CREDENTIALS_ERROR_MSG),
            redirect_url,
        )
        .into_response();
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_auth_cookie(jar.clone(), user.id, cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
        })
        .into_response()
}
