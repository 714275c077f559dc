//! Execution read API handlers.
//!
//! Executions are read-only over HTTP: state changes happen inside the
//! orchestrator, callers poll these endpoints to observe progress.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::db::models::Execution;
use crate::error::AppError;
use crate::handlers::servers::CountResponse;
use crate::services::execution::{ExecutionDetail, ExecutionFilter, ExecutionService};

/// List executions, newest first.
///
/// GET /api/executions?state=&playbook_id=&limit=&offset=
pub async fn list(
    State(service): State<ExecutionService>,
    Query(filter): Query<ExecutionFilter>,
) -> Result<Json<Vec<Execution>>, AppError> {
    let executions = service.list(&filter).await?;
    Ok(Json(executions))
}

/// Get execution detail including per-target outcomes.
///
/// GET /api/executions/{execution_id}
pub async fn get(
    State(service): State<ExecutionService>,
    Path(execution_id): Path<i64>,
) -> Result<Json<ExecutionDetail>, AppError> {
    let detail = service.get(execution_id).await?;
    Ok(Json(detail))
}

/// Count all executions.
///
/// GET /api/executions/count/total
pub async fn count_total(
    State(service): State<ExecutionService>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count().await?;
    Ok(Json(CountResponse { count }))
}

/// Count executions by state.
///
/// GET /api/executions/count/by-state/{state}
pub async fn count_by_state(
    State(service): State<ExecutionService>,
    Path(state): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count_by_state(&state).await?;
    Ok(Json(CountResponse { count }))
}

/// Count executions by playbook.
///
/// GET /api/executions/count/by-playbook/{playbook_id}
pub async fn count_by_playbook(
    State(service): State<ExecutionService>,
    Path(playbook_id): Path<i64>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count_by_playbook(playbook_id).await?;
    Ok(Json(CountResponse { count }))
}
