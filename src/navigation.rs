//! The navigation bar shared by all pages.
//!
//! Links are filtered by the session's role: the Users and Reports pages are
//! only reachable by admins, so their links are hidden from everyone else.

use maud::{Markup, html};

use crate::{endpoints, policy::Role};

/// Template for a link in the navigation bar.
///
/// It will change appearance if `is_current` is set to `true`. Only one link
/// should be set as active at any one time.
#[derive(Clone)]
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm lg:bg-transparent
        lg:text-blue-700 lg:p-0 dark:text-white lg:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100
        lg:hover:bg-transparent lg:border-0 lg:hover:text-blue-700 lg:p-0
        dark:text-white lg:dark:hover:text-blue-500 dark:hover:bg-gray-700
        dark:hover:text-white lg:dark:hover:bg-transparent"
        };

        html!( a href=(self.url) class=(style) { (self.title) } )
    }
}

/// The navigation bar with the links the given role may use.
pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar for `role`.
    ///
    /// If a link matches `active_endpoint`, then that link will be marked as
    /// active and displayed differently in the HTML.
    pub fn new(active_endpoint: &str, role: Role) -> NavBar<'_> {
        let mut links = vec![
            Link {
                url: endpoints::DASHBOARD_VIEW,
                title: "Dashboard",
                is_current: active_endpoint == endpoints::DASHBOARD_VIEW,
            },
            Link {
                url: endpoints::TRANSACTIONS_VIEW,
                title: "Transactions",
                is_current: active_endpoint == endpoints::TRANSACTIONS_VIEW,
            },
        ];

        if role == Role::Admin {
            links.push(Link {
                url: endpoints::USERS_VIEW,
                title: "Users",
                is_current: active_endpoint == endpoints::USERS_VIEW,
            });
            links.push(Link {
                url: endpoints::REPORTS_VIEW,
                title: "Reports",
                is_current: active_endpoint == endpoints::REPORTS_VIEW,
            });
        }

        links.push(Link {
            url: endpoints::PROFILE_VIEW,
            title: "Profile",
            is_current: active_endpoint == endpoints::PROFILE_VIEW,
        });
        links.push(Link {
            url: endpoints::LOG_OUT,
            title: "Log out",
            is_current: false,
        });

        NavBar { links }
    }

    /// Render the navigation bar.
    pub fn into_html(self) -> Markup {
        html! {
            nav class="bg-white border-gray-200 dark:bg-gray-900 w-full"
            {
                div class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
                {
                    a href=(endpoints::DASHBOARD_VIEW) class="flex items-center space-x-3"
                    {
                        span class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                        {
                            "Finanzas"
                        }
                    }

                    div class="w-full lg:block lg:w-auto"
                    {
                        ul class="font-medium flex flex-col p-4 lg:p-0 mt-4 border border-gray-100
                            rounded-lg bg-gray-50 lg:flex-row lg:space-x-8 rtl:space-x-reverse
                            lg:mt-0 lg:border-0 lg:bg-white dark:bg-gray-800 lg:dark:bg-gray-900
                            dark:border-gray-700"
                        {
                            @for link in self.links
                            {
                                li { (link.into_html()) }
                            }
                        }
                    }
                }
            }
        }
    }
}
