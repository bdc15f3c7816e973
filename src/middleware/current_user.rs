use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    app::AppState,
    models::{Role, User},
    store::users,
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

/// The user behind the request's `auth_token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Resolves the cookie to a user still present in the database. Any failure
/// (no cookie, bad or expired token, deleted user) yields `None`.
pub async fn get_current_user(cookies: &Cookies, state: &AppState) -> Option<CurrentUser> {
    let token = cookies.get(AUTH_COOKIE)?.value().to_string();

    let claims = match verify_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected auth token");
            return None;
        }
    };

    let user_id = claims.user_id()?;
    match users::find_by_id(&state.db, user_id).await {
        Ok(user) => user.map(CurrentUser::from),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "failed to load user for auth token");
            None
        }
    }
}
