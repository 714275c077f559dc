//! Server database queries.
//!
//! The provisioning columns (`provision_status`, `provision_error`,
//! `key_path`) are only written by `mark_deployed` / `mark_provision_failed`,
//! which the provisioner alone calls. Reachability status goes through
//! `update_status`.

use crate::db::models::Server;
use crate::db::DbPool;
use crate::error::AppResult;

const SERVER_COLUMNS: &str = "id, name, address, ssh_user, ssh_port, key_path, \
     provision_status, provision_error, status, created_at, updated_at";

/// Insert a new server in `pending` provisioning state.
pub async fn insert_server(
    pool: &DbPool,
    name: &str,
    address: &str,
    ssh_user: &str,
    ssh_port: i32,
) -> AppResult<Server> {
    let server = sqlx::query_as::<_, Server>(&format!(
        r#"
        INSERT INTO armada.server (name, address, ssh_user, ssh_port)
        VALUES ($1, $2, $3, $4)
        RETURNING {SERVER_COLUMNS}
        "#,
    ))
    .bind(name)
    .bind(address)
    .bind(ssh_user)
    .bind(ssh_port)
    .fetch_one(pool)
    .await?;

    Ok(server)
}

/// Get a server by ID.
pub async fn get_server_by_id(pool: &DbPool, id: i64) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        "SELECT {SERVER_COLUMNS} FROM armada.server WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// Get a server by name.
pub async fn get_server_by_name(pool: &DbPool, name: &str) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        "SELECT {SERVER_COLUMNS} FROM armada.server WHERE name = $1",
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// Get a server by address.
pub async fn get_server_by_address(pool: &DbPool, address: &str) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        "SELECT {SERVER_COLUMNS} FROM armada.server WHERE address = $1",
    ))
    .bind(address)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// List all servers, oldest first.
pub async fn list_servers(pool: &DbPool) -> AppResult<Vec<Server>> {
    let servers = sqlx::query_as::<_, Server>(&format!(
        "SELECT {SERVER_COLUMNS} FROM armada.server ORDER BY id ASC",
    ))
    .fetch_all(pool)
    .await?;

    Ok(servers)
}

/// List servers by reachability status.
pub async fn list_servers_by_status(pool: &DbPool, status: &str) -> AppResult<Vec<Server>> {
    let servers = sqlx::query_as::<_, Server>(&format!(
        "SELECT {SERVER_COLUMNS} FROM armada.server WHERE status = $1 ORDER BY id ASC",
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(servers)
}

/// Count all servers.
pub async fn count_servers(pool: &DbPool) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM armada.server")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Count servers by reachability status.
pub async fn count_servers_by_status(pool: &DbPool, status: &str) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM armada.server WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Mark a server as deployed, recording the installed key path.
pub async fn mark_deployed(pool: &DbPool, id: i64, key_path: &str) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        r#"
        UPDATE armada.server
        SET provision_status = 'deployed', provision_error = NULL,
            key_path = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {SERVER_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(key_path)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// Mark a provisioning attempt as failed, retaining the reason for retry.
pub async fn mark_provision_failed(
    pool: &DbPool,
    id: i64,
    reason: &str,
) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        r#"
        UPDATE armada.server
        SET provision_status = 'failed', provision_error = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {SERVER_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// Update the reachability status (online/offline).
pub async fn update_status(pool: &DbPool, id: i64, status: &str) -> AppResult<Option<Server>> {
    let server = sqlx::query_as::<_, Server>(&format!(
        r#"
        UPDATE armada.server
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {SERVER_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?;

    Ok(server)
}

/// Delete a server by ID.
pub async fn delete_server(pool: &DbPool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM armada.server WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
