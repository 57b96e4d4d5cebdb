//! Profile: the caller's own projection and statistics, as JSON and as a
//! self-service page.

mod api;
mod page;

pub use api::{get_profile_api, update_profile_api};
pub use page::{get_profile_page, put_edit_profile};
