//! The sign-up page and the handler for creating a new account.
//!
//! New accounts always get the `user` role; only an existing admin can
//! promote them afterwards through the users page.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
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
    auth::set_auth_cookie,
    html::{BUTTON_PRIMARY_STYLE, auth_card, base, loading_spinner, password_input, text_input},
    password::{PasswordHash, ValidatedPassword},
    policy::Role,
    user::create_user,
};

/// The minimum number of characters for a display name.
const NAME_MIN_LENGTH: usize = 2;

/// Which sign-up field an error message belongs to.
#[derive(Debug, Default)]
struct SignUpFormErrors<'a> {
    name: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn sign_up_form(name: &str, email: &str, errors: SignUpFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_UP_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#name, #email, #password, #confirm_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("name", "Name", "text", name, errors.name))
            (text_input("email", "Email", "email", email, errors.email))
            (password_input("password", "Password", errors.password))
            (password_input("confirm_password", "Confirm Password", errors.confirm_password))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form("", "", SignUpFormErrors::default());
    let content = auth_card("Create an account", &form);
    base("Sign Up", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct SignUpState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for creating the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SignUpState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SignUpState> for Key {
    fn from_ref(state: &SignUpState) -> Self {
        state.cookie_key.clone()
    }
}

/// The form data for a sign-up request.
#[derive(Debug, Deserialize)]
pub struct SignUpData {
    /// The display name for the new account.
    pub name: String,
    /// The email the new account logs in with.
    pub email: String,
    /// The password for the new account.
    pub password: String,
    /// Must match `password`.
    pub confirm_password: String,
}

/// Create a new `user`-role account, log it in, and redirect to the dashboard.
///
/// Validation failures re-render the form with the error attached to the
/// offending field.
pub async fn post_sign_up(
    State(state): State<SignUpState>,
    jar: PrivateCookieJar,
    Form(data): Form<SignUpData>,
) -> Response {
    if data.name.trim().len() < NAME_MIN_LENGTH {
        return sign_up_form(
            &data.name,
            &data.email,
            SignUpFormErrors {
                name: Some("Name must be at least 2 characters"),
                ..Default::default()
            },
        )
        .into_response();
    }

    if !data.email.contains('@') {
        return sign_up_form(
            &data.name,
            &data.email,
            SignUpFormErrors {
                email: Some("Please enter a valid email address"),
                ..Default::default()
            },
        )
        .into_response();
    }

    if data.password != data.confirm_password {
        return sign_up_form(
            &data.name,
            &data.email,
            SignUpFormErrors {
                confirm_password: Some("Passwords do not match"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let validated_password = match ValidatedPassword::new(&data.password) {
        Ok(password) => password,
        Err(Error::TooWeak(feedback)) => {
            let message = format!("Password is too weak: {feedback}");
            return sign_up_form(
                &data.name,
                &data.email,
                SignUpFormErrors {
                    password: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while validating password: {error}");
            return error.into_alert_response();
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("Could not hash password: {error}");
            return error.into_alert_response();
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match create_user(
            data.name.trim(),
            &data.email,
            Role::User,
            password_hash,
            &connection,
        ) {
            Ok(user) => user,
            Err(Error::DuplicateEmail) => {
                return sign_up_form(
                    &data.name,
                    &data.email,
                    SignUpFormErrors {
                        email: Some("User already registered"),
                        ..Default::default()
                    },
                )
                .into_response();
            }
            Err(error) => {
                tracing::error!("Could not create user: {error}");
                return error.into_alert_response();
            }
        }
    };

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
            updated_jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
    }
}
