//! The admin page for listing users and editing their name and role.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
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
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        access_denied_page, base, loading_spinner,
    },
    navigation::NavBar,
    policy::{Action, Resource, Role, authorize},
    user::{
        UserID, UserProfile,
        core::{list_users, update_user},
    },
};

/// The state needed to render the users page and handle the edit dialog form.
#[derive(Debug, Clone)]
pub struct UsersPageState {
    /// The database connection for reading and updating users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UsersPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn role_badge(role: Role) -> Markup {
    let style = match role {
        Role::Admin => {
            "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold \
             text-blue-800 bg-blue-100 rounded-full dark:bg-blue-900 dark:text-blue-300"
        }
        Role::User => {
            "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold \
             text-gray-800 bg-gray-100 rounded-full dark:bg-gray-700 dark:text-gray-300"
        }
    };

    html!( span class=(style) { (role) } )
}

fn edit_user_dialog(user: &UserProfile) -> Markup {
    let dialog_id = format!("edit-user-dialog-{}", user.id);
    let alert_id = format!("edit-user-alert-{}", user.id);
    let update_url = endpoints::format_endpoint(endpoints::UPDATE_USER, user.id.as_i64());

    html! {
        button
            type="button"
            class=(LINK_STYLE)
            onclick={ "document.getElementById('" (dialog_id) "').showModal()" }
        {
            "Edit"
        }

        dialog
            id=(dialog_id)
            class="rounded-lg p-6 w-full max-w-md bg-white dark:bg-gray-800 text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold mb-4" { "Edit user" }

            div id=(alert_id) {}

            form
                hx-put=(update_url)
                hx-target-error={ "#" (alert_id) }
                hx-swap="innerHTML"
                class="space-y-4"
            {
                div
                {
                    label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                    input
                        type="text"
                        name="name"
                        value=(user.name)
                        class=(FORM_TEXT_INPUT_STYLE)
                        minlength="2"
                        required;
                }

                div
                {
                    label for="role" class=(FORM_LABEL_STYLE) { "Role" }
                    select name="role" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        option value="user" selected[user.role == Role::User] { "user" }
                        option value="admin" selected[user.role == Role::Admin] { "admin" }
                    }
                }

                div class="flex gap-2"
                {
                    button type="submit" class=(BUTTON_PRIMARY_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                        "Save"
                    }

                    button
                        type="button"
                        class=(BUTTON_SECONDARY_STYLE)
                        onclick={ "document.getElementById('" (dialog_id) "').close()" }
                    {
                        "Cancel"
                    }
                }
            }
        }
    }
}

fn users_table(users: &[UserProfile]) -> Markup {
    html! {
        div class="relative overflow-x-auto shadow-md sm:rounded-lg w-full"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for user in users
                    {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (user.name) }
                            td class=(TABLE_CELL_STYLE) { (user.email) }
                            td class=(TABLE_CELL_STYLE) { (role_badge(user.role)) }
                            td class=(TABLE_CELL_STYLE) { (edit_user_dialog(user)) }
                        }
                    }
                }
            }
        }
    }
}

/// Display the users page. Non-admins get an access denied page.
pub async fn get_users_page(
    State(state): State<UsersPageState>,
    Extension(session): Extension<Session>,
) -> Response {
    if authorize(session.role, Resource::Users, Action::List).is_err() {
        let nav_bar = NavBar::new(endpoints::USERS_VIEW, session.role).into_html();
        return (StatusCode::FORBIDDEN, access_denied_page(nav_bar)).into_response();
    }

    let users = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match list_users(&connection) {
            Ok(users) => users,
            Err(error) => return error.into_response(),
        }
    };

    let nav_bar = NavBar::new(endpoints::USERS_VIEW, session.role).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl"
            {
                h1 class="text-2xl font-bold mb-4" { "Users" }

                (users_table(&users))
            }
        }
    };

    base("Users", &[], &content).into_response()
}

/// The form data from the edit user dialog.
#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    /// The new display name.
    pub name: Option<String>,
    /// The new role, "admin" or "user".
    pub role: Option<String>,
}

/// Handle the edit user dialog form: update the user and redirect back to
/// the users page so the table refetches.
pub async fn put_update_user(
    State(state): State<UsersPageState>,
    Extension(session): Extension<Session>,
    Path(user_id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Response {
    if let Err(error) = authorize(session.role, Resource::Users, Action::Update) {
        return error.into_alert_response();
    }

    let (name, role) = match (form.name, form.role) {
        (Some(name), Some(role)) if !name.trim().is_empty() => (name, role),
        _ => return Error::MissingFields.into_alert_response(),
    };

    let role = match Role::try_from(role.as_str()) {
        Ok(role) => role,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_user(UserID::new(user_id), name.trim(), role, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::USERS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::NotFound) => Error::UserNotFound.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
