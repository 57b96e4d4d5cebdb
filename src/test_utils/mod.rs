#![allow(missing_docs)]

pub(crate) mod html;

pub(crate) use html::{parse_html_document, parse_html_fragment};

use axum_test::TestServer;
use cookie::CookieJar;
use rusqlite::Connection;
use time::macros::date;

use crate::{
    AppState, build_router, endpoints,
    password::{PasswordHash, ValidatedPassword},
    policy::Role,
    transaction::{NewTransaction, create_transaction},
    user::{User, create_user},
};

/// The password every seeded test account logs in with.
pub(crate) const TEST_PASSWORD: &str = "password123";

pub(crate) const ADMIN_EMAIL: &str = "admin@example.com";
pub(crate) const USER_EMAIL: &str = "user1@example.com";

/// A test server running the full application router over an in-memory
/// database, seeded with one admin and one regular user.
pub(crate) struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub admin: User,
    pub user: User,
}

impl TestApp {
    /// Log in as the seeded admin and return the auth cookies.
    pub async fn log_in_admin(&self) -> CookieJar {
        self.log_in(ADMIN_EMAIL).await
    }

    /// Log in as the seeded regular user and return the auth cookies.
    pub async fn log_in_user(&self) -> CookieJar {
        self.log_in(USER_EMAIL).await
    }

    pub async fn log_in(&self, email: &str) -> CookieJar {
        let response = self
            .server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", email), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status_see_other();

        response.cookies()
    }

    /// Insert a transaction owned by the seeded admin directly into the store.
    pub fn seed_transaction(&self, concepto: &str, monto: f64, fecha: time::Date) {
        let connection = self.state.db_connection.lock().unwrap();
        create_transaction(
            NewTransaction {
                concepto: concepto.to_owned(),
                monto,
                fecha,
                user_id: self.admin.id,
            },
            &connection,
        )
        .expect("Could not seed transaction");
    }
}

/// Build a [TestApp] with the full router and a seeded in-memory database.
pub(crate) fn spawn_test_app() -> TestApp {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    let state = AppState::new(connection, "test cookie secret", "Etc/UTC")
        .expect("Could not create app state");

    // Minimum cost keeps the tests fast.
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash test password");

    let (admin, user) = {
        let connection = state.db_connection.lock().unwrap();
        let admin = create_user(
            "Admin User",
            ADMIN_EMAIL,
            Role::Admin,
            password_hash.clone(),
            &connection,
        )
        .expect("Could not seed admin user");
        let user = create_user(
            "User 1",
            USER_EMAIL,
            Role::User,
            password_hash,
            &connection,
        )
        .expect("Could not seed regular user");

        (admin, user)
    };

    let server =
        TestServer::try_new(build_router(state.clone())).expect("Could not create test server");

    TestApp {
        server,
        state,
        admin,
        user,
    }
}

/// A convenient fixed date for seeded transactions.
pub(crate) fn sample_date() -> time::Date {
    date!(2024 - 01 - 15)
}
