pub mod current_user;

pub use current_user::{get_current_user, CurrentUser, AUTH_COOKIE};
