//! Execution database queries.
//!
//! The state column is only ever written by `transition_state`, a
//! compare-and-swap on the expected current state. Two concurrent transition
//! attempts for the same execution serialize on the row: exactly one matches
//! the expected state, the other affects zero rows and is rejected upstream.

use chrono::{DateTime, Utc};

use crate::db::models::{Execution, ExecutionState, ExecutionTarget};
use crate::db::DbPool;
use crate::error::AppResult;

const EXECUTION_COLUMNS: &str = "id, playbook_id, requested_by, server_ids, dry_run, state, \
     error_kind, error, created_at, started_at, finished_at";

/// Insert a new execution in `dry` state.
pub async fn insert_execution(
    pool: &DbPool,
    playbook_id: i64,
    requested_by: &str,
    server_ids: &[i64],
    dry_run: bool,
) -> AppResult<Execution> {
    let execution = sqlx::query_as::<_, Execution>(&format!(
        r#"
        INSERT INTO armada.execution (playbook_id, requested_by, server_ids, dry_run, state)
        VALUES ($1, $2, $3, $4, 'dry')
        RETURNING {EXECUTION_COLUMNS}
        "#,
    ))
    .bind(playbook_id)
    .bind(requested_by)
    .bind(server_ids)
    .bind(dry_run)
    .fetch_one(pool)
    .await?;

    Ok(execution)
}

/// Compare-and-swap state transition.
///
/// Returns the updated row when the execution was in `from`, `None` when the
/// swap lost (the execution is no longer in `from`).
#[allow(clippy::too_many_arguments)]
pub async fn transition_state(
    pool: &DbPool,
    id: i64,
    from: ExecutionState,
    to: ExecutionState,
    error_kind: Option<&str>,
    error: Option<&str>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
) -> AppResult<Option<Execution>> {
    let execution = sqlx::query_as::<_, Execution>(&format!(
        r#"
        UPDATE armada.execution
        SET state = $3,
            error_kind = $4,
            error = $5,
            started_at = COALESCE($6, started_at),
            finished_at = COALESCE($7, finished_at)
        WHERE id = $1 AND state = $2
        RETURNING {EXECUTION_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(error_kind)
    .bind(error)
    .bind(started_at)
    .bind(finished_at)
    .fetch_optional(pool)
    .await?;

    Ok(execution)
}

/// Get an execution by ID.
pub async fn get_execution_by_id(pool: &DbPool, id: i64) -> AppResult<Option<Execution>> {
    let execution = sqlx::query_as::<_, Execution>(&format!(
        "SELECT {EXECUTION_COLUMNS} FROM armada.execution WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(execution)
}

/// List executions, newest first, with optional state/playbook filters.
pub async fn list_executions(
    pool: &DbPool,
    state: Option<&str>,
    playbook_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Execution>> {
    let executions = sqlx::query_as::<_, Execution>(&format!(
        r#"
        SELECT {EXECUTION_COLUMNS}
        FROM armada.execution
        WHERE ($1::TEXT IS NULL OR state = $1)
          AND ($2::BIGINT IS NULL OR playbook_id = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    ))
    .bind(state)
    .bind(playbook_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(executions)
}

/// Count all executions.
pub async fn count_executions(pool: &DbPool) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM armada.execution")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Count executions in a given state.
pub async fn count_executions_by_state(pool: &DbPool, state: &str) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM armada.execution WHERE state = $1")
        .bind(state)
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}

/// Count executions for a playbook.
pub async fn count_executions_by_playbook(pool: &DbPool, playbook_id: i64) -> AppResult<i64> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM armada.execution WHERE playbook_id = $1")
            .bind(playbook_id)
            .fetch_one(pool)
            .await?;

    Ok(count.0)
}

/// Record a per-target outcome.
pub async fn insert_target_outcome(
    pool: &DbPool,
    execution_id: i64,
    server_id: i64,
    position: i32,
    status: &str,
    error: Option<&str>,
) -> AppResult<ExecutionTarget> {
    let target = sqlx::query_as::<_, ExecutionTarget>(
        r#"
        INSERT INTO armada.execution_target (execution_id, server_id, position, status, error)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, execution_id, server_id, position, status, error, finished_at
        "#,
    )
    .bind(execution_id)
    .bind(server_id)
    .bind(position)
    .bind(status)
    .bind(error)
    .fetch_one(pool)
    .await?;

    Ok(target)
}

/// List target outcomes for an execution in selection order.
pub async fn list_target_outcomes(
    pool: &DbPool,
    execution_id: i64,
) -> AppResult<Vec<ExecutionTarget>> {
    let targets = sqlx::query_as::<_, ExecutionTarget>(
        r#"
        SELECT id, execution_id, server_id, position, status, error, finished_at
        FROM armada.execution_target
        WHERE execution_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(execution_id)
    .fetch_all(pool)
    .await?;

    Ok(targets)
}
