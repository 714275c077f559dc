//! Metrics API and streaming handlers.
//!
//! Collector agents POST samples; dashboards read recent/latest samples or
//! subscribe to the WebSocket stream. The stream is not restartable: a
//! reconnecting consumer resumes from the present, history stays behind the
//! REST endpoints.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
    Json,
};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::db::models::{MetricIngestRequest, MetricSample};
use crate::error::AppError;
use crate::services::metrics::{MetricsService, ServerLatestMetric};

/// Query parameters for the recent-samples endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// Ingest a metric sample.
///
/// POST /api/metrics
pub async fn ingest(
    State(service): State<MetricsService>,
    Json(request): Json<MetricIngestRequest>,
) -> Result<Json<MetricSample>, AppError> {
    let sample = service.ingest(request).await?;
    Ok(Json(sample))
}

/// Recent samples for a server, newest first.
///
/// GET /api/servers/{server_id}/metrics?limit=
pub async fn recent(
    State(service): State<MetricsService>,
    Path(server_id): Path<i64>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<MetricSample>>, AppError> {
    let samples = service.recent(server_id, query.limit).await?;
    Ok(Json(samples))
}

/// Latest sample per server across the fleet.
///
/// GET /api/metrics/latest
pub async fn latest(
    State(service): State<MetricsService>,
) -> Result<Json<Vec<ServerLatestMetric>>, AppError> {
    let latest = service.latest_all().await?;
    Ok(Json(latest))
}

/// Live stream of all samples.
///
/// GET /ws/metrics
pub async fn stream(State(service): State<MetricsService>, ws: WebSocketUpgrade) -> Response {
    let rx = service.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx, None))
}

/// Live stream filtered to one server.
///
/// GET /ws/metrics/{server_id}
pub async fn stream_for_server(
    State(service): State<MetricsService>,
    Path(server_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Response {
    let rx = service.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx, Some(server_id)))
}

/// Forward broadcast samples onto one socket until either side goes away.
async fn forward(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<MetricSample>,
    server_filter: Option<i64>,
) {
    loop {
        match rx.recv().await {
            Ok(sample) => {
                if let Some(server_id) = server_filter {
                    if sample.server_id != server_id {
                        continue;
                    }
                }

                let text = match serde_json::to_string(&sample) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize metric sample");
                        continue;
                    }
                };

                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Slow consumer; the stream is not replayable, so just note
                // the gap and keep going from the present.
                tracing::warn!(skipped, "Metric stream consumer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_query_default_limit() {
        let query: RecentQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 10);
    }
}
