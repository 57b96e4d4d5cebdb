//! Authentication middleware that resolves sessions, extends cookies, and
//! rejects unauthenticated requests.
//!
//! Three variants share one implementation and differ only in how they reject:
//! page routes redirect to the log-in page, htmx form routes send an
//! `HX-Redirect` header, and JSON API routes answer `401` with a JSON body.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error, endpoints,
    auth::{
        Session,
        cookie::{extend_auth_cookie_duration_if_needed, get_user_id_from_auth_cookie},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    user::get_user_by_id,
};

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection used to resolve the session user's role.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Resolve the session for a request: cookie to user ID, then user ID to the
/// stored role.
///
/// A cookie naming a user that no longer exists counts as unauthenticated.
fn resolve_session(jar: &PrivateCookieJar, state: &AuthState) -> Result<Session, Error> {
    let user_id = get_user_id_from_auth_cookie(jar)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    match get_user_by_id(user_id, &connection) {
        Ok(user) => Ok(Session {
            user_id: user.id,
            role: user.role,
        }),
        Err(Error::NotFound) => Err(Error::Unauthenticated),
        Err(error) => Err(error),
    }
}

#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_rejection: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Rejecting request.");
            return get_rejection(&log_in_redirect_url);
        }
    };

    let session = match resolve_session(&jar, &state) {
        Ok(session) => session,
        Err(_) => return get_rejection(&log_in_redirect_url),
    };

    parts.extensions.insert(session);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    // Sliding session: push the cookie expiry out on every authenticated
    // request, keeping whichever expiry is later.
    let (mut parts, body) = response.into_parts();
    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), Duration::minutes(5)) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending cookie duration: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}

/// Middleware that checks for a valid auth cookie on page routes.
///
/// The session is placed into the request and the request executed normally
/// if the cookie is valid, otherwise a redirect to the log-in page is
/// returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(session): Extension<Session>` to receive the session.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware that checks for a valid auth cookie on htmx form routes.
///
/// Responds with an `HX-Redirect` header so htmx performs a client-side
/// redirect to the log-in page instead of swapping in its HTML.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware that checks for a valid auth cookie on JSON API routes.
///
/// Unauthenticated requests get `401 {"message": "Unauthorized"}` and never
/// reach the handler or the store.
pub async fn auth_guard_api(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |_| {
        Error::Unauthenticated.into_response()
    })
    .await
}
