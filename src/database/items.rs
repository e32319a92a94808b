use chrono::Utc;
use sqlx::SqlitePool;

use super::models::Item;
use super::StoreError;

const ITEM_COLUMNS: &str = "id, title, description, owner_id, is_completed, created_at, updated_at";

pub async fn insert(
    pool: &SqlitePool,
    owner_id: i64,
    title: &str,
    description: Option<&str>,
) -> Result<Item, StoreError> {
    let now = Utc::now();
    let item = sqlx::query_as::<_, Item>(&format!(
        "INSERT INTO items (title, description, owner_id, is_completed, created_at, updated_at) \
         VALUES (?, ?, ?, 0, ?, ?) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(title)
    .bind(description)
    .bind(owner_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

pub async fn list_for_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Item>, StoreError> {
    let items = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE owner_id = ? ORDER BY id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Fetch one item scoped to its owner. Another user's item is indistinguishable
/// from a missing one.
pub async fn find_for_owner(
    pool: &SqlitePool,
    owner_id: i64,
    item_id: i64,
) -> Result<Option<Item>, StoreError> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = ? AND owner_id = ?"
    ))
    .bind(item_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;
    Ok(item)
}

pub async fn update(
    pool: &SqlitePool,
    item_id: i64,
    title: &str,
    description: Option<&str>,
    is_completed: bool,
) -> Result<Item, StoreError> {
    let item = sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET title = ?, description = ?, is_completed = ?, updated_at = ? \
         WHERE id = ? RETURNING {ITEM_COLUMNS}"
    ))
    .bind(title)
    .bind(description)
    .bind(is_completed)
    .bind(Utc::now())
    .bind(item_id)
    .fetch_one(pool)
    .await?;
    Ok(item)
}

pub async fn delete(pool: &SqlitePool, item_id: i64) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::database::{self, users};

    async fn pool_with_users() -> (SqlitePool, i64, i64) {
        let pool = database::connect(&test_config().database).await.unwrap();
        database::init_schema(&pool).await.unwrap();
        let alice = users::insert(&pool, "alice", "alice@example.com", "h").await.unwrap();
        let bob = users::insert(&pool, "bob", "bob@example.com", "h").await.unwrap();
        (pool, alice.id, bob.id)
    }

    #[tokio::test]
    async fn items_are_scoped_to_their_owner() {
        let (pool, alice, bob) = pool_with_users().await;
        let item = insert(&pool, alice, "groceries", None).await.unwrap();

        assert!(find_for_owner(&pool, alice, item.id).await.unwrap().is_some());
        assert!(find_for_owner(&pool, bob, item.id).await.unwrap().is_none());

        assert_eq!(list_for_owner(&pool, alice).await.unwrap().len(), 1);
        assert!(list_for_owner(&pool, bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_bumps_updated_at() {
        let (pool, alice, _) = pool_with_users().await;
        let item = insert(&pool, alice, "groceries", Some("milk")).await.unwrap();

        let updated = update(&pool, item.id, "groceries", Some("milk, eggs"), true)
            .await
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("milk, eggs"));
        assert!(updated.is_completed);
        assert!(updated.updated_at >= item.updated_at);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let (pool, alice, _) = pool_with_users().await;
        let item = insert(&pool, alice, "groceries", None).await.unwrap();
        delete(&pool, item.id).await.unwrap();
        assert!(find_for_owner(&pool, alice, item.id).await.unwrap().is_none());
    }
}
