//! The JSON API endpoints for the caller's own profile.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Session,
    policy::{Action, Resource, authorize},
    transaction::{TransactionStatistics, get_user_statistics},
    user::{
        UserProfile,
        core::{get_user_by_id, update_profile},
    },
};

/// The state needed by the profile API.
#[derive(Debug, Clone)]
pub struct ProfileApiState {
    /// The database connection for reading and updating the caller's record.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The caller's projection plus their derived transaction statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// The caller's client-safe projection.
    #[serde(flatten)]
    pub user: UserProfile,
    /// Count and signed sum of the caller's transactions.
    pub statistics: TransactionStatistics,
}

/// `GET /api/profile`: the caller's own projection with transaction
/// statistics.
///
/// Returns 404 if the user record vanished between session resolution and
/// this read.
pub async fn get_profile_api(
    State(state): State<ProfileApiState>,
    Extension(session): Extension<Session>,
) -> Result<Json<ProfileResponse>, Error> {
    authorize(session.role, Resource::Profile, Action::Read)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(session.user_id, &connection).map_err(|error| match error {
        Error::NotFound => Error::UserNotFound,
        error => error,
    })?;
    let statistics = get_user_statistics(session.user_id, &connection)?;

    Ok(Json(ProfileResponse {
        user: user.into(),
        statistics,
    }))
}

/// The request body for updating the caller's own name and email.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
    /// The new display name.
    pub name: Option<String>,
    /// The new email address.
    pub email: Option<String>,
}

/// `PUT /api/profile`: update the caller's own name and email and return the
/// updated projection. Role is never touched here.
pub async fn update_profile_api(
    State(state): State<ProfileApiState>,
    Extension(session): Extension<Session>,
    body: Result<Json<UpdateProfileBody>, JsonRejection>,
) -> Result<Json<UserProfile>, Error> {
    authorize(session.role, Resource::Profile, Action::Update)?;

    let Json(body) = body.map_err(|_| Error::MissingFields)?;

    let (name, email) = match (body.name, body.email) {
        (Some(name), Some(email)) if !name.trim().is_empty() && !email.trim().is_empty() => {
            (name, email)
        }
        _ => return Err(Error::MissingFields),
    };

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let updated = update_profile(session.user_id, name.trim(), email.trim(), &connection)?;

    Ok(Json(updated))
}
