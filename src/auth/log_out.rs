//! Log-out route handler that invalidates authentication cookies and
//! redirects users.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use crate::{auth::cookie::invalidate_auth_cookie, endpoints};

/// Invalidate the auth cookie and redirect the client to the log-in page.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}

#[cfg(test)]
mod log_out_tests {
    use axum::{
        body::Body,
        http::{Response, StatusCode, header::SET_COOKIE},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};

    use crate::{
        auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
        endpoints,
        user::UserID,
    };

    use super::get_log_out;

    #[tokio::test]
    async fn log_out_invalidates_auth_cookie_and_redirects() {
        let jar = set_auth_cookie(get_jar(), UserID::new(123), DEFAULT_COOKIE_DURATION).unwrap();

        let response = get_log_out(jar).await;

        assert_redirect(&response, endpoints::LOG_IN_VIEW);
        assert_cookies_expired(&response);
    }

    fn get_jar() -> PrivateCookieJar {
        let key = Key::from(&Sha512::digest("42"));
        PrivateCookieJar::new(key)
    }

    fn assert_redirect(response: &Response<Body>, want_location: &str) {
        let redirect_location = response.headers().get("location").unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect_location, want_location);
    }

    fn assert_cookies_expired(response: &Response<Body>) {
        let mut saw_cookie = false;

        for header in response.headers().get_all(SET_COOKIE) {
            saw_cookie = true;
            let cookie_text = header.to_str().unwrap();
            assert!(
                cookie_text.contains("Max-Age=0"),
                "expected cookie to be expired: {cookie_text}"
            );
        }

        assert!(saw_cookie, "expected at least one Set-Cookie header");
    }
}
