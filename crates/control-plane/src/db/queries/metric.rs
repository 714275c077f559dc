//! Metric database queries.
//!
//! The metric table is append-only: samples are inserted and read, never
//! updated or deleted. Readings are stored in their normalized tagged form.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::models::{MetricSample, Reading};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Raw metric row; readings come back as JSONB values.
#[derive(Debug, Clone, FromRow)]
struct MetricRow {
    id: i64,
    server_id: i64,
    cpu: serde_json::Value,
    memory: serde_json::Value,
    disk: serde_json::Value,
    gpu: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<MetricRow> for MetricSample {
    type Error = AppError;

    fn try_from(row: MetricRow) -> Result<Self, Self::Error> {
        Ok(MetricSample {
            id: row.id,
            server_id: row.server_id,
            cpu: serde_json::from_value(row.cpu)?,
            memory: serde_json::from_value(row.memory)?,
            disk: serde_json::from_value(row.disk)?,
            gpu: serde_json::from_value(row.gpu)?,
            recorded_at: row.recorded_at,
        })
    }
}

/// Insert a normalized sample.
pub async fn insert_sample(
    pool: &DbPool,
    server_id: i64,
    cpu: &Reading,
    memory: &Reading,
    disk: &Reading,
    gpu: &Reading,
    recorded_at: DateTime<Utc>,
) -> AppResult<MetricSample> {
    let row = sqlx::query_as::<_, MetricRow>(
        r#"
        INSERT INTO armada.metric (server_id, cpu, memory, disk, gpu, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, server_id, cpu, memory, disk, gpu, recorded_at
        "#,
    )
    .bind(server_id)
    .bind(serde_json::to_value(cpu)?)
    .bind(serde_json::to_value(memory)?)
    .bind(serde_json::to_value(disk)?)
    .bind(serde_json::to_value(gpu)?)
    .bind(recorded_at)
    .fetch_one(pool)
    .await?;

    row.try_into()
}

/// List the most recent samples for a server, newest first.
pub async fn list_recent_samples(
    pool: &DbPool,
    server_id: i64,
    limit: i64,
) -> AppResult<Vec<MetricSample>> {
    let rows = sqlx::query_as::<_, MetricRow>(
        r#"
        SELECT id, server_id, cpu, memory, disk, gpu, recorded_at
        FROM armada.metric
        WHERE server_id = $1
        ORDER BY recorded_at DESC
        LIMIT $2
        "#,
    )
    .bind(server_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(MetricSample::try_from).collect()
}

/// Latest sample per server across the fleet.
pub async fn latest_sample_per_server(pool: &DbPool) -> AppResult<Vec<MetricSample>> {
    let rows = sqlx::query_as::<_, MetricRow>(
        r#"
        SELECT DISTINCT ON (server_id)
            id, server_id, cpu, memory, disk, gpu, recorded_at
        FROM armada.metric
        ORDER BY server_id, recorded_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(MetricSample::try_from).collect()
}
