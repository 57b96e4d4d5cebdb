//! Alert fragments for form endpoints.
//!
//! Form posts go through htmx with the `response-targets` extension, so a
//! failed mutation swaps one of these fragments into the form's alert region
//! and leaves the rest of the page untouched.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

const SUCCESS_STYLE: &str = "p-4 mb-4 text-sm text-green-800 rounded-lg \
    bg-green-50 dark:bg-gray-800 dark:text-green-400";
const ERROR_STYLE: &str = "p-4 mb-4 text-sm text-red-800 rounded-lg \
    bg-red-50 dark:bg-gray-800 dark:text-red-400";

/// A success or error message displayed near the form that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// An error with a message shown to the user.
    Error {
        /// The message shown to the user.
        message: String,
    },
    /// A success message with supporting details.
    Success {
        /// The headline of the alert.
        message: String,
        /// Supporting details shown below the headline.
        details: String,
    },
}

impl Alert {
    /// Render the alert as markup.
    pub fn into_markup(self) -> Markup {
        match self {
            Alert::Error { message } => html! {
                div class=(ERROR_STYLE) role="alert"
                {
                    span class="font-medium" { (message) }
                }
            },
            Alert::Success { message, details } => html! {
                div class=(SUCCESS_STYLE) role="alert"
                {
                    span class="font-medium" { (message) }
                    @if !details.is_empty() {
                        p { (details) }
                    }
                }
            },
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_markup().into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use super::Alert;

    #[test]
    fn error_alert_contains_message() {
        let markup = Alert::Error {
            message: "Missing required fields".to_owned(),
        }
        .into_markup();

        assert!(markup.into_string().contains("Missing required fields"));
    }

    #[test]
    fn success_alert_contains_details() {
        let markup = Alert::Success {
            message: "Saved".to_owned(),
            details: "Your profile was updated.".to_owned(),
        }
        .into_markup();

        let html = markup.into_string();
        assert!(html.contains("Saved"));
        assert!(html.contains("Your profile was updated."));
    }
}
