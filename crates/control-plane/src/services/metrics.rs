//! Metrics collector service.
//!
//! Ingestion is the normalization boundary: raw readings are converted into
//! the tagged [`Reading`] form before they are stored or fanned out, so
//! consumers never see the collectors' shape heterogeneity. Stored samples
//! are append-only. Live fan-out uses a broadcast channel; the stream is
//! lazy and not restartable, a reconnecting consumer resumes from the
//! present.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::models::{MetricIngestRequest, MetricSample, Reading, Server};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};

/// Latest sample for one server, for the fleet overview.
#[derive(Debug, Clone, Serialize)]
pub struct ServerLatestMetric {
    pub server_id: i64,
    pub server_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<MetricSample>,
}

/// Metrics collector and streamer.
#[derive(Clone)]
pub struct MetricsService {
    db: DbPool,
    hub: broadcast::Sender<MetricSample>,
}

impl MetricsService {
    pub fn new(db: DbPool, buffer: usize) -> Self {
        let (hub, _) = broadcast::channel(buffer.max(1));
        Self { db, hub }
    }

    /// Ingest one sample: normalize, append, broadcast.
    pub async fn ingest(&self, request: MetricIngestRequest) -> AppResult<MetricSample> {
        queries::server::get_server_by_id(&self.db, request.server_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Server not found: {}", request.server_id))
            })?;

        let cpu = Reading::normalize(&request.cpu);
        let memory = Reading::normalize(&request.memory);
        let disk = Reading::normalize(&request.disk);
        let gpu = Reading::normalize(&request.gpu);
        let recorded_at = request.timestamp.unwrap_or_else(Utc::now);

        let sample = queries::metric::insert_sample(
            &self.db,
            request.server_id,
            &cpu,
            &memory,
            &disk,
            &gpu,
            recorded_at,
        )
        .await?;

        // No subscribers is fine; the sample is already durable.
        let _ = self.hub.send(sample.clone());

        Ok(sample)
    }

    /// Recent samples for a server, newest first.
    pub async fn recent(&self, server_id: i64, limit: i64) -> AppResult<Vec<MetricSample>> {
        queries::server::get_server_by_id(&self.db, server_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))?;

        queries::metric::list_recent_samples(&self.db, server_id, limit.clamp(1, 500)).await
    }

    /// Latest sample per server across the fleet.
    pub async fn latest_all(&self) -> AppResult<Vec<ServerLatestMetric>> {
        let servers: Vec<Server> = queries::server::list_servers(&self.db).await?;
        let latest = queries::metric::latest_sample_per_server(&self.db).await?;

        Ok(servers
            .into_iter()
            .map(|server| {
                let sample = latest.iter().find(|m| m.server_id == server.id).cloned();
                ServerLatestMetric {
                    server_id: server.id,
                    server_name: server.name,
                    status: server.status,
                    latest: sample,
                }
            })
            .collect())
    }

    /// Subscribe to the live sample stream.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricSample> {
        self.hub.subscribe()
    }
}
