//! The JSON API endpoints for listing and updating users. Admin only.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::Session,
    policy::{Action, Resource, Role, authorize},
    user::{
        UserID, UserProfile,
        core::{list_users, update_user},
    },
};

/// The state needed by the users API.
#[derive(Debug, Clone)]
pub struct UsersApiState {
    /// The database connection for reading and updating users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UsersApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// `GET /api/users` (admin only): all users ordered by name, projected to
/// `{id, name, email, role}` with no secrets.
pub async fn get_users_api(
    State(state): State<UsersApiState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<UserProfile>>, Error> {
    authorize(session.role, Resource::Users, Action::List)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let users = list_users(&connection)?;

    Ok(Json(users))
}

/// The request body for updating a user's name and role.
#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    /// The ID of the user to update.
    pub id: Option<i64>,
    /// The new display name.
    pub name: Option<String>,
    /// The new role, "admin" or "user".
    pub role: Option<String>,
}

/// `PUT /api/users` (admin only): update a user's name and role and return
/// the updated projection.
///
/// Repeating the same update is idempotent: the second call stores and
/// returns exactly the same projection.
pub async fn update_user_api(
    State(state): State<UsersApiState>,
    Extension(session): Extension<Session>,
    body: Result<Json<UpdateUserBody>, JsonRejection>,
) -> Result<Json<UserProfile>, Error> {
    authorize(session.role, Resource::Users, Action::Update)?;

    let Json(body) = body.map_err(|_| Error::MissingFields)?;

    let (id, name, role) = match (body.id, body.name, body.role) {
        (Some(id), Some(name), Some(role)) if !name.trim().is_empty() && !role.is_empty() => {
            (id, name, role)
        }
        _ => return Err(Error::MissingFields),
    };

    let role = Role::try_from(role.as_str())?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let updated = update_user(UserID::new(id), name.trim(), role, &connection)
        .map_err(|error| match error {
            Error::NotFound => Error::UserNotFound,
            error => error,
        })?;

    Ok(Json(updated))
}

#[cfg(test)]
mod users_api_tests {
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::spawn_test_app,
        user::get_user_by_id,
    };

    #[tokio::test]
    async fn list_requires_a_session() {
        let app = spawn_test_app();

        let response = app.server.get(endpoints::USERS_API).await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn update_requires_a_session_and_writes_nothing() {
        let app = spawn_test_app();

        let response = app
            .server
            .put(endpoints::USERS_API)
            .json(&json!({"id": app.user.id.as_i64(), "name": "Hacked", "role": "admin"}))
            .await;

        response.assert_status_unauthorized();

        let connection = app.state.db_connection.lock().unwrap();
        let user = get_user_by_id(app.user.id, &connection).unwrap();
        assert_eq!(user.name, "User 1");
    }

    #[tokio::test]
    async fn list_requires_admin() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .get(endpoints::USERS_API)
            .add_cookies(cookies)
            .await;

        response.assert_status_forbidden();
        response.assert_json(&json!({"message": "Forbidden: Admin access required"}));
    }

    #[tokio::test]
    async fn admin_lists_users_ordered_by_name_without_secrets() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::USERS_API)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let users: Vec<serde_json::Value> = response.json();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["name"], "Admin User");
        assert_eq!(users[1]["name"], "User 1");
        assert!(users[0].get("password").is_none());
        assert_eq!(users[0]["role"], "admin");
    }

    #[tokio::test]
    async fn admin_updates_name_and_role() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;
        let target = app.user.id;

        let response = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies.clone())
            .json(&json!({"id": target.as_i64(), "name": "John Updated", "role": "admin"}))
            .await;

        response.assert_status_ok();
        let updated: serde_json::Value = response.json();
        assert_eq!(updated["name"], "John Updated");
        assert_eq!(updated["role"], "admin");
        assert_eq!(updated["email"], "user1@example.com");

        // The list reflects the change.
        let users: Vec<serde_json::Value> = app
            .server
            .get(endpoints::USERS_API)
            .add_cookies(cookies)
            .await
            .json();
        assert!(
            users
                .iter()
                .any(|user| user["name"] == "John Updated" && user["role"] == "admin")
        );
    }

    #[tokio::test]
    async fn repeated_update_is_idempotent() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;
        let body = json!({"id": app.user.id.as_i64(), "name": "John Updated", "role": "admin"});

        let first: serde_json::Value = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies.clone())
            .json(&body)
            .await
            .json();
        let second: serde_json::Value = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies)
            .json(&body)
            .await
            .json();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn update_with_missing_fields_gets_bad_request() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies)
            .json(&json!({"id": app.user.id.as_i64(), "name": "John Updated"}))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "Missing required fields"}));
    }

    #[tokio::test]
    async fn update_with_unknown_role_gets_bad_request() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies)
            .json(&json!({"id": app.user.id.as_i64(), "name": "John", "role": "administrador"}))
            .await;

        response.assert_status_bad_request();
        response.assert_json(&json!({"message": "Invalid role"}));
    }

    #[tokio::test]
    async fn update_of_unknown_user_gets_not_found() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies)
            .json(&json!({"id": 9999, "name": "Nobody", "role": "user"}))
            .await;

        response.assert_status_not_found();
        response.assert_json(&json!({"message": "User not found"}));
    }

    #[tokio::test]
    async fn non_admin_update_leaves_store_unchanged() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .put(endpoints::USERS_API)
            .add_cookies(cookies)
            .json(&json!({"id": app.user.id.as_i64(), "name": "Hacked", "role": "admin"}))
            .await;

        response.assert_status_forbidden();

        let connection = app.state.db_connection.lock().unwrap();
        let user = get_user_by_id(app.user.id, &connection).unwrap();
        assert_eq!(user.name, "User 1");
        assert_eq!(user.role, crate::policy::Role::User);
    }
}
