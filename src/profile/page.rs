//! The profile page: the caller's own details, derived statistics, and a
//! self-service edit form for name and email.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
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

use crate::{
    AppState, Error, endpoints,
    auth::Session,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, PAGE_CONTAINER_STYLE, base, format_currency,
        loading_spinner, text_input,
    },
    navigation::NavBar,
    policy::{Action, Resource, authorize},
    transaction::{TransactionStatistics, get_user_statistics},
    user::{
        UserProfile,
        core::{get_user_by_id, update_profile},
    },
};

/// The state needed to render the profile page and handle its edit form.
#[derive(Debug, Clone)]
pub struct ProfilePageState {
    /// The database connection for reading and updating the caller's record.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfilePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn statistics_cards(statistics: &TransactionStatistics) -> Markup {
    html! {
        div class="grid grid-cols-1 sm:grid-cols-2 gap-4 mb-6"
        {
            div class=(CARD_STYLE)
            {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Transactions recorded" }
                p class="text-3xl font-bold" { (statistics.transaction_count) }
            }

            div class=(CARD_STYLE)
            {
                p class="text-sm text-gray-500 dark:text-gray-400" { "Total amount" }
                p class="text-3xl font-bold" { (format_currency(statistics.total_amount)) }
            }
        }
    }
}

fn profile_form(user: &UserProfile) -> Markup {
    html! {
        div id="profile-alert" {}

        form
            hx-put=(endpoints::EDIT_PROFILE)
            hx-target-error="#profile-alert"
            hx-swap="innerHTML"
            hx-indicator="#indicator"
            class="space-y-4"
        {
            (text_input("name", "Name", "text", &user.name, None))
            (text_input("email", "Email", "email", &user.email, None))

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                "Save changes"
            }
        }
    }
}

/// Display the profile page.
pub async fn get_profile_page(
    State(state): State<ProfilePageState>,
    Extension(session): Extension<Session>,
) -> Response {
    let (user, statistics) = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        let user = match get_user_by_id(session.user_id, &connection) {
            Ok(user) => UserProfile::from(user),
            Err(error) => return error.into_response(),
        };

        let statistics = match get_user_statistics(session.user_id, &connection) {
            Ok(statistics) => statistics,
            Err(error) => return error.into_response(),
        };

        (user, statistics)
    };

    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW, session.role).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-2xl"
            {
                h1 class="text-2xl font-bold mb-1" { "Profile" }
                p class="text-gray-500 dark:text-gray-400 mb-4"
                {
                    (user.email) " · " (user.role)
                }

                (statistics_cards(&statistics))

                div class=(CARD_STYLE)
                {
                    h2 class="text-lg font-semibold mb-4" { "Your details" }
                    (profile_form(&user))
                }
            }
        }
    };

    base("Profile", &[], &content).into_response()
}

/// The form data from the profile edit form.
#[derive(Debug, Deserialize)]
pub struct EditProfileForm {
    /// The new display name.
    pub name: Option<String>,
    /// The new email address.
    pub email: Option<String>,
}

/// Handle the profile edit form: update name and email, then redirect back
/// to the profile page.
pub async fn put_edit_profile(
    State(state): State<ProfilePageState>,
    Extension(session): Extension<Session>,
    Form(form): Form<EditProfileForm>,
) -> Response {
    if let Err(error) = authorize(session.role, Resource::Profile, Action::Update) {
        return error.into_alert_response();
    }

    let (name, email) = match (form.name, form.email) {
        (Some(name), Some(email)) if !name.trim().is_empty() && !email.trim().is_empty() => {
            (name, email)
        }
        _ => return Error::MissingFields.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_profile(session.user_id, name.trim(), email.trim(), &connection) {
        Ok(_) => (
            HxRedirect(endpoints::PROFILE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("could not update profile for {}: {error}", session.user_id);
            error.into_alert_response()
        }
    }
}
