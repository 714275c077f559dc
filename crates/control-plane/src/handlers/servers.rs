//! Server registry API handlers.
//!
//! Registration and provisioning retry both carry a one-time password in the
//! request body; it is handed to the provisioner and never persisted.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::db::models::{ProvisionRetryRequest, ServerRegisterRequest, ServerResponse};
use crate::error::AppError;
use crate::services::ServerService;

/// Count response shared by the count endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Register a server.
///
/// POST /api/servers
///
/// The server is created with provisioning status `pending`; a provisioning
/// attempt with the supplied password starts in the background.
pub async fn register(
    State(service): State<ServerService>,
    Json(request): Json<ServerRegisterRequest>,
) -> Result<Json<ServerResponse>, AppError> {
    let server = service.register(request).await?;
    Ok(Json(server.into()))
}

/// List all servers.
///
/// GET /api/servers
pub async fn list(
    State(service): State<ServerService>,
) -> Result<Json<Vec<ServerResponse>>, AppError> {
    let servers = service.list().await?;
    Ok(Json(servers.into_iter().map(Into::into).collect()))
}

/// Get a server by id.
///
/// GET /api/servers/{server_id}
pub async fn get(
    State(service): State<ServerService>,
    Path(server_id): Path<i64>,
) -> Result<Json<ServerResponse>, AppError> {
    let server = service.get(server_id).await?;
    Ok(Json(server.into()))
}

/// List servers by reachability status.
///
/// GET /api/servers/status/{status}
pub async fn list_by_status(
    State(service): State<ServerService>,
    Path(status): Path<String>,
) -> Result<Json<Vec<ServerResponse>>, AppError> {
    let servers = service.list_by_status(&status).await?;
    Ok(Json(servers.into_iter().map(Into::into).collect()))
}

/// Count all servers.
///
/// GET /api/servers/count/total
pub async fn count_total(
    State(service): State<ServerService>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count().await?;
    Ok(Json(CountResponse { count }))
}

/// Count servers by reachability status.
///
/// GET /api/servers/count/by-status/{status}
pub async fn count_by_status(
    State(service): State<ServerService>,
    Path(status): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count_by_status(&status).await?;
    Ok(Json(CountResponse { count }))
}

/// Retry provisioning with a corrected one-time password.
///
/// POST /api/servers/{server_id}/provision/retry
///
/// Guarded: a server that is already `deployed` rejects the retry so a
/// working key is never overwritten.
pub async fn retry_provision(
    State(service): State<ServerService>,
    Path(server_id): Path<i64>,
    Json(request): Json<ProvisionRetryRequest>,
) -> Result<Json<ServerResponse>, AppError> {
    let server = service.retry_provision(server_id, &request.password).await?;
    Ok(Json(server.into()))
}

/// Probe a server's reachability now.
///
/// POST /api/servers/{server_id}/status/refresh
pub async fn refresh_status(
    State(service): State<ServerService>,
    Path(server_id): Path<i64>,
) -> Result<Json<ServerResponse>, AppError> {
    let server = service.refresh_status(server_id).await?;
    Ok(Json(server.into()))
}

/// Delete a server.
///
/// DELETE /api/servers/{server_id}
pub async fn delete(
    State(service): State<ServerService>,
    Path(server_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    service.delete(server_id).await?;
    Ok(Json(json!({ "deleted": true })))
}
