//! Users: the core model and queries, the admin JSON API, and the admin page
//! for editing names and roles.

pub mod core;

mod api;
mod users_page;

pub use api::{get_users_api, update_user_api};
pub use core::{
    User, UserID, UserProfile, count_users, create_user, create_user_table, get_user_by_email,
    get_user_by_id, list_users, update_profile, update_user,
};
pub use users_page::{get_users_page, put_update_user};
