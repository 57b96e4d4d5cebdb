//! The dashboard: navigation tiles filtered by the session's role.

use axum::{
    Extension,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    auth::Session,
    endpoints,
    html::{CARD_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    policy::Role,
};

/// A navigation tile on the dashboard.
struct Module {
    title: &'static str,
    description: &'static str,
    href: &'static str,
    admin_only: bool,
}

const MODULES: [Module; 3] = [
    Module {
        title: "Ingresos y Egresos",
        description: "Browse and record financial transactions",
        href: endpoints::TRANSACTIONS_VIEW,
        admin_only: false,
    },
    Module {
        title: "Usuarios",
        description: "Manage application users and their roles",
        href: endpoints::USERS_VIEW,
        admin_only: true,
    },
    Module {
        title: "Reportes",
        description: "Generate and download financial reports",
        href: endpoints::REPORTS_VIEW,
        admin_only: true,
    },
];

fn module_tile(module: &Module) -> Markup {
    html! {
        a href=(module.href) class="block"
        {
            div class={ (CARD_STYLE) " cursor-pointer hover:shadow-lg transition-shadow duration-200" }
            {
                h2 class="text-xl font-bold mb-2" { (module.title) }
                p class="text-gray-500 dark:text-gray-400" { (module.description) }
            }
        }
    }
}

/// Display the dashboard with the tiles the caller's role may open.
pub async fn get_dashboard_page(Extension(session): Extension<Session>) -> Response {
    let is_admin = session.role == Role::Admin;
    let visible_modules: Vec<&Module> = MODULES
        .iter()
        .filter(|module| !module.admin_only || is_admin)
        .collect();

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, session.role).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl"
            {
                h1 class="text-3xl font-bold" { "Dashboard" }
                p class="text-gray-500 dark:text-gray-400 mb-6"
                {
                    "Welcome to your financial control panel"
                }

                div class="grid gap-6 grid-cols-1 sm:grid-cols-3"
                {
                    @for module in &visible_modules
                    {
                        (module_tile(module))
                    }
                }
            }
        }
    };

    base("Dashboard", &[], &content).into_response()
}

#[cfg(test)]
mod dashboard_tests {
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{parse_html_document, spawn_test_app},
    };

    #[tokio::test]
    async fn admin_sees_all_three_tiles() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Ingresos y Egresos"));
        assert!(text.contains("Usuarios"));
        assert!(text.contains("Reportes"));
    }

    #[tokio::test]
    async fn regular_user_sees_only_the_transactions_tile() {
        let app = spawn_test_app();
        let cookies = app.log_in_user().await;

        let response = app
            .server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookies(cookies)
            .await;

        response.assert_status_ok();
        let text = response.text();
        assert!(text.contains("Ingresos y Egresos"));
        assert!(!text.contains("Usuarios"));
        assert!(!text.contains("Reportes"));
    }

    #[tokio::test]
    async fn unauthenticated_dashboard_request_redirects_to_log_in() {
        let app = spawn_test_app();

        let response = app.server.get(endpoints::DASHBOARD_VIEW).await;

        response.assert_status_see_other();
        assert!(
            response
                .header("location")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
    }

    #[tokio::test]
    async fn tiles_link_to_their_pages() {
        let app = spawn_test_app();
        let cookies = app.log_in_admin().await;

        let response = app
            .server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookies(cookies)
            .await;

        let document = parse_html_document(&response.text());
        let hrefs: Vec<String> = document
            .select(&Selector::parse("a[href]").unwrap())
            .filter_map(|a| a.value().attr("href").map(str::to_owned))
            .collect();

        assert!(hrefs.contains(&endpoints::TRANSACTIONS_VIEW.to_owned()));
        assert!(hrefs.contains(&endpoints::USERS_VIEW.to_owned()));
        assert!(hrefs.contains(&endpoints::REPORTS_VIEW.to_owned()));
    }
}
