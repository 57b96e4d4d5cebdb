//! The endpoint URIs for pages, the JSON API, and htmx form handlers.
//!
//! For endpoints that take a parameter, e.g., '/users/{user_id}', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page listing all transactions with the create dialog for admins.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The admin page for listing and editing users.
pub const USERS_VIEW: &str = "/users";
/// The page for viewing and editing the caller's own profile.
pub const PROFILE_VIEW: &str = "/profile";
/// The admin page with aggregate reports and charts.
pub const REPORTS_VIEW: &str = "/reports";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for getting the sign up page.
pub const SIGN_UP_VIEW: &str = "/sign_up";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for creating a new account.
pub const SIGN_UP_API: &str = "/api/sign_up";

/// The JSON API route for listing and creating transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The JSON API route for listing and updating users.
pub const USERS_API: &str = "/api/users";
/// The JSON API route for the caller's own profile and statistics.
pub const PROFILE_API: &str = "/api/profile";

/// The htmx form handler for the create transaction dialog.
pub const NEW_TRANSACTION: &str = "/transactions/new";
/// The htmx form handler for the edit user dialog.
pub const UPDATE_USER: &str = "/users/{user_id}";
/// The htmx form handler for the profile edit form.
pub const EDIT_PROFILE: &str = "/profile/edit";

/// The CSV download of daily net movements for the selected date range.
pub const REPORTS_DAILY_CSV: &str = "/reports/daily.csv";
/// The CSV download of the income versus expense split for the selected date range.
pub const REPORTS_SPLIT_CSV: &str = "/reports/split.csv";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
