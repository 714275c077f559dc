//! Health endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::db::pool::health_check as db_health_check;
use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

/// Detailed health response: identity, database connectivity, uptime.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealthResponse {
    pub status: String,
    pub server_name: String,
    pub database: String,
    pub uptime_seconds: u64,
    pub version: String,
}

/// Liveness probe.
///
/// `GET /health`
///
/// Answers without touching the database, so load balancers can poll it
/// cheaply.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}

/// Detailed health.
///
/// `GET /api/health`
///
/// Probes the database and reports 503 when it is unreachable; run
/// submissions and the execution ledger cannot work without it.
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiHealthResponse>) {
    let db_healthy = db_health_check(&state.db).await;

    let (status_code, status, database) = if db_healthy {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    let response = ApiHealthResponse {
        status: status.to_string(),
        server_name: state.config.server_name.clone(),
        database: database.to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status, "ok");
    }

    #[test]
    fn test_api_health_response_shape() {
        let response = ApiHealthResponse {
            status: "ok".to_string(),
            server_name: "armada-control-plane".to_string(),
            database: "connected".to_string(),
            uptime_seconds: 12,
            version: "0.4.3".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["database"], "connected");
        assert_eq!(json["server_name"], "armada-control-plane");
    }
}
