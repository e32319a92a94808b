use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::database::users;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tasks;

use super::users::UserResponse;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /api/v1/auth/register - Create a new account
///
/// Hashes the password off the async worker, inserts the row, and fires the
/// welcome-email and audit-log tasks after the user exists. The password
/// hash never appears in the response.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_registration(&payload)?;

    let password = payload.password.clone();
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("hashing task failed: {}", e)))??;

    let user = users::insert(&state.pool, &payload.username, &payload.email, &hashed).await?;

    tasks::send_welcome_email(user.email.clone(), user.username.clone());
    tasks::log_user_action(
        user.username.clone(),
        "REGISTER",
        format!("email: {}", user.email),
    );

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/v1/auth/token - Authenticate and receive a bearer token
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller; both produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = users::find_by_username(&state.pool, &form.username).await?;

    let verified = match &user {
        Some(user) => {
            let password = form.password.clone();
            let hashed = user.hashed_password.clone();
            tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
                .await
                .map_err(|e| ApiError::internal(format!("verification task failed: {}", e)))??
        }
        None => false,
    };

    let user = match (user, verified) {
        (Some(user), true) => user,
        _ => return Err(ApiError::invalid_credentials("Incorrect username or password")),
    };

    let ttl = Duration::minutes(state.config.security.access_token_expire_minutes);
    let access_token = state.tokens.issue(&user.username, Some(ttl))?;

    tasks::log_user_action(user.username, "LOGIN", "successful authentication".to_string());

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

fn validate_registration(payload: &RegisterRequest) -> Result<(), ApiError> {
    if payload.username.trim().is_empty() || payload.username.len() > 50 {
        return Err(ApiError::validation_failed(
            "username must be between 1 and 50 characters",
        ));
    }
    if !payload.email.contains('@') || payload.email.len() > 100 {
        return Err(ApiError::validation_failed("email must be a valid address"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation_failed(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}
