use axum::{extract::Extension, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::database::models::User;
use crate::error::ApiError;

/// Public view of a user row; the credential hash stays server-side.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// GET /api/v1/users/me - The authenticated user's own record
pub async fn me(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(user.into()))
}
