use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::database::items;
use crate::database::models::Item;
use crate::error::ApiError;
use crate::state::AppState;
use crate::tasks;

#[derive(Debug, Deserialize)]
pub struct ItemCreate {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            owner_id: item.owner_id,
            is_completed: item.is_completed,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// POST /api/v1/items - Create an item owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<ItemCreate>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    validate_title(&payload.title)?;
    validate_description(payload.description.as_deref())?;

    let item = items::insert(
        &state.pool,
        user.id,
        payload.title.trim(),
        payload.description.as_deref(),
    )
    .await?;

    tasks::send_item_notification(user.email, user.username.clone(), item.title.clone(), "created");
    tasks::log_user_action(user.username, "CREATE_ITEM", format!("title: {}", item.title));

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// GET /api/v1/items - All items owned by the caller
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = items::list_for_owner(&state.pool, user.id).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// GET /api/v1/items/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = find_owned(&state, user.id, item_id).await?;
    Ok(Json(item.into()))
}

/// PUT /api/v1/items/:id - Partial update of the caller's item
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(payload): Json<ItemUpdate>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = find_owned(&state, user.id, item_id).await?;
    let was_completed = item.is_completed;

    let title = payload.title.unwrap_or(item.title);
    validate_title(&title)?;
    let description = payload.description.or(item.description);
    validate_description(description.as_deref())?;
    let is_completed = payload.is_completed.unwrap_or(item.is_completed);

    let updated = items::update(
        &state.pool,
        item.id,
        title.trim(),
        description.as_deref(),
        is_completed,
    )
    .await?;

    tasks::send_item_notification(
        user.email,
        user.username.clone(),
        updated.title.clone(),
        "updated",
    );
    if !was_completed && updated.is_completed {
        tasks::process_item_completion(updated.id, user.username.clone(), updated.title.clone());
    }
    tasks::log_user_action(
        user.username,
        "UPDATE_ITEM",
        format!("item_id: {}, completed: {}", updated.id, updated.is_completed),
    );

    Ok(Json(updated.into()))
}

/// DELETE /api/v1/items/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let item = find_owned(&state, user.id, item_id).await?;
    items::delete(&state.pool, item.id).await?;

    tasks::send_item_notification(user.email, user.username.clone(), item.title.clone(), "deleted");
    tasks::log_user_action(
        user.username,
        "DELETE_ITEM",
        format!("item_id: {}, title: {}", item.id, item.title),
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn find_owned(state: &AppState, owner_id: i64, item_id: i64) -> Result<Item, ApiError> {
    items::find_for_owner(&state.pool, owner_id, item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || title.len() > 200 {
        return Err(ApiError::validation_failed(
            "title must be between 1 and 200 characters",
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ApiError> {
    if description.is_some_and(|d| d.len() > 1000) {
        return Err(ApiError::validation_failed(
            "description must be at most 1000 characters",
        ));
    }
    Ok(())
}
