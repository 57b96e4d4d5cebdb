//! Authentication: the session type, auth cookies, the guard middleware, and
//! the log-in, log-out, and sign-up flows.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod sign_up;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_api, auth_guard_hx};
pub use redirect::normalize_redirect_url;
pub use sign_up::{get_sign_up_page, post_sign_up};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_EXPIRY, COOKIE_USER_ID};
#[cfg(test)]
pub(crate) use middleware::AuthState;

use crate::{policy::Role, user::UserID};

/// The resolved identity of a request: who is calling and with which role.
///
/// Produced by the auth guard middleware from the auth cookie and the user
/// table, and consumed read-only by every handler via
/// `Extension(session): Extension<Session>`. The role is looked up from the
/// store when the session is resolved so a role change takes effect on the
/// next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// The ID of the authenticated user.
    pub user_id: UserID,
    /// The authenticated user's role.
    pub role: Role,
}
