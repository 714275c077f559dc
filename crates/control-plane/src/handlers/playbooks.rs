//! Playbook catalog API handlers.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::models::{Playbook, PlaybookCreateRequest};
use crate::error::AppError;
use crate::handlers::servers::CountResponse;
use crate::services::PlaybookService;

/// Register a playbook.
///
/// POST /api/playbooks
pub async fn register(
    State(service): State<PlaybookService>,
    Json(request): Json<PlaybookCreateRequest>,
) -> Result<Json<Playbook>, AppError> {
    let playbook = service.register(request).await?;
    Ok(Json(playbook))
}

/// List all playbooks.
///
/// GET /api/playbooks
pub async fn list(State(service): State<PlaybookService>) -> Result<Json<Vec<Playbook>>, AppError> {
    let playbooks = service.list().await?;
    Ok(Json(playbooks))
}

/// Get a playbook by id.
///
/// GET /api/playbooks/{playbook_id}
pub async fn get(
    State(service): State<PlaybookService>,
    Path(playbook_id): Path<i64>,
) -> Result<Json<Playbook>, AppError> {
    let playbook = service.get(playbook_id).await?;
    Ok(Json(playbook))
}

/// Count all playbooks.
///
/// GET /api/playbooks/count/total
pub async fn count_total(
    State(service): State<PlaybookService>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count().await?;
    Ok(Json(CountResponse { count }))
}
