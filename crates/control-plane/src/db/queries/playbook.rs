//! Playbook database queries.

use crate::db::models::{Playbook, INVENTORY_MODE_DYNAMIC};
use crate::db::DbPool;
use crate::error::AppResult;

/// Insert a new playbook. Inventory mode is always "dynamic".
pub async fn insert_playbook(pool: &DbPool, name: &str, playbook_path: &str) -> AppResult<Playbook> {
    let playbook = sqlx::query_as::<_, Playbook>(
        r#"
        INSERT INTO armada.playbook (name, playbook_path, inventory_mode)
        VALUES ($1, $2, $3)
        RETURNING id, name, playbook_path, inventory_mode, created_at
        "#,
    )
    .bind(name)
    .bind(playbook_path)
    .bind(INVENTORY_MODE_DYNAMIC)
    .fetch_one(pool)
    .await?;

    Ok(playbook)
}

/// Get a playbook by ID.
pub async fn get_playbook_by_id(pool: &DbPool, id: i64) -> AppResult<Option<Playbook>> {
    let playbook = sqlx::query_as::<_, Playbook>(
        "SELECT id, name, playbook_path, inventory_mode, created_at FROM armada.playbook WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(playbook)
}

/// Get a playbook by name.
pub async fn get_playbook_by_name(pool: &DbPool, name: &str) -> AppResult<Option<Playbook>> {
    let playbook = sqlx::query_as::<_, Playbook>(
        "SELECT id, name, playbook_path, inventory_mode, created_at FROM armada.playbook WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(playbook)
}

/// List all playbooks, oldest first.
pub async fn list_playbooks(pool: &DbPool) -> AppResult<Vec<Playbook>> {
    let playbooks = sqlx::query_as::<_, Playbook>(
        "SELECT id, name, playbook_path, inventory_mode, created_at FROM armada.playbook ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(playbooks)
}

/// Count all playbooks.
pub async fn count_playbooks(pool: &DbPool) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM armada.playbook")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
