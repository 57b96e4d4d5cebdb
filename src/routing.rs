//! Application router configuration with protected and unprotected route
//! definitions.
//!
//! Routes come in three protected flavours that differ in how they reject an
//! unauthenticated request: pages redirect to the log-in page, htmx form
//! endpoints send an `HX-Redirect` header, and `/api` JSON endpoints answer
//! 401 with a JSON body.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use maud::html;
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_api, auth_guard_hx, get_log_in_page, get_log_out, get_sign_up_page,
        post_log_in, post_sign_up,
    },
    dashboard::get_dashboard_page,
    endpoints,
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    profile::{get_profile_api, get_profile_page, put_edit_profile, update_profile_api},
    report::{get_daily_csv, get_reports_page, get_split_csv},
    transaction::{
        create_transaction_api, get_transactions_api, get_transactions_page, post_new_transaction,
    },
    user::{get_users_api, get_users_page, put_update_user, update_user_api},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::SIGN_UP_VIEW, get(get_sign_up_page))
        .route(endpoints::SIGN_UP_API, post(post_sign_up));

    let protected_pages = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::USERS_VIEW, get(get_users_page))
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .route(endpoints::REPORTS_VIEW, get(get_reports_page))
        .route(endpoints::REPORTS_DAILY_CSV, get(get_daily_csv))
        .route(endpoints::REPORTS_SPLIT_CSV, get(get_split_csv))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT routes need to use the HX-Redirect header for auth
    // redirects to work properly for htmx requests.
    let protected_forms = Router::new()
        .route(endpoints::NEW_TRANSACTION, post(post_new_transaction))
        .route(endpoints::UPDATE_USER, put(put_update_user))
        .route(endpoints::EDIT_PROFILE, put(put_edit_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let protected_api = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_transactions_api).post(create_transaction_api),
        )
        .route(
            endpoints::USERS_API,
            get(get_users_api).put(update_user_api),
        )
        .route(
            endpoints::PROFILE_API,
            get(get_profile_api).put(update_profile_api),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard_api));

    protected_pages
        .merge(protected_forms)
        .merge(protected_api)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

/// The page shown for unknown paths.
async fn get_404_not_found() -> Response {
    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-3xl font-bold mb-2" { "404" }
            p class="mb-4" { "The page you were looking for does not exist." }
            a href=(endpoints::DASHBOARD_VIEW) class=(LINK_STYLE) { "Back to the dashboard" }
        }
    };

    (StatusCode::NOT_FOUND, base("Not Found", &[], &content)).into_response()
}
