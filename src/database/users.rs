use chrono::Utc;
use sqlx::SqlitePool;

use super::models::User;
use super::{is_unique_violation, StoreError};

/// Insert a new user row. A unique violation is disambiguated with a
/// follow-up username lookup so the caller can report which field clashed.
pub async fn insert(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    hashed_password: &str,
) -> Result<User, StoreError> {
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, hashed_password, is_active, created_at)
        VALUES (?, ?, ?, 1, ?)
        RETURNING id, username, email, hashed_password, is_active, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(err) if is_unique_violation(&err) => {
            if find_by_username(pool, username).await?.is_some() {
                Err(StoreError::DuplicateUsername)
            } else {
                Err(StoreError::DuplicateEmail)
            }
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, hashed_password, is_active, created_at \
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
