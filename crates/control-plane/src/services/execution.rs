//! Execution record store.
//!
//! Durable, append-mostly ledger of every run. Rows are created by the
//! orchestrator at submit time and mutated only through [`transition`],
//! which validates the move against the state machine and performs a
//! compare-and-swap on the current state. Executions are never deleted.
//!
//! [`transition`]: ExecutionService::transition

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{
    Execution, ExecutionErrorKind, ExecutionState, ExecutionTarget, TargetStatus,
};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};

/// Filter for listing executions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionFilter {
    pub state: Option<String>,
    pub playbook_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Detailed execution information including per-target outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionDetail {
    #[serde(flatten)]
    pub execution: Execution,
    pub targets: Vec<ExecutionTarget>,
}

/// Execution record store service.
#[derive(Clone)]
pub struct ExecutionService {
    db: DbPool,
}

impl ExecutionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Create the initial record for a submitted run. Always starts in
    /// `dry`, which doubles as the queued marker for real runs.
    pub async fn create(
        &self,
        playbook_id: i64,
        requested_by: &str,
        server_ids: &[i64],
        dry_run: bool,
    ) -> AppResult<Execution> {
        let execution =
            queries::execution::insert_execution(&self.db, playbook_id, requested_by, server_ids, dry_run)
                .await?;

        tracing::info!(
            execution_id = execution.id,
            playbook_id,
            targets = server_ids.len(),
            dry_run,
            "Execution created"
        );

        Ok(execution)
    }

    /// The single allowed mutation path for execution state.
    ///
    /// Rejects moves the state machine forbids, then compare-and-swaps on
    /// the expected current state so a lost race is surfaced instead of
    /// silently overwriting. `started_at` is stamped on entry to `running`,
    /// `finished_at` on entry to a terminal state.
    pub async fn transition(
        &self,
        execution_id: i64,
        from: ExecutionState,
        to: ExecutionState,
        outcome: Option<(ExecutionErrorKind, String)>,
    ) -> AppResult<Execution> {
        if !from.can_transition(to) {
            return Err(AppError::Conflict(format!(
                "illegal execution state transition: {} -> {}",
                from, to
            )));
        }

        let now = Utc::now();
        let started_at = (to == ExecutionState::Running).then_some(now);
        let finished_at = to.is_terminal().then_some(now);
        let (error_kind, error) = match &outcome {
            Some((kind, reason)) => (Some(kind.as_str()), Some(reason.as_str())),
            None => (None, None),
        };

        let updated = queries::execution::transition_state(
            &self.db,
            execution_id,
            from,
            to,
            error_kind,
            error,
            started_at,
            finished_at,
        )
        .await?;

        let execution = updated.ok_or_else(|| {
            AppError::Conflict(format!(
                "execution {} is not in state {}; transition to {} rejected",
                execution_id, from, to
            ))
        })?;

        tracing::info!(
            execution_id,
            from = %from,
            to = %to,
            "Execution state transition"
        );

        Ok(execution)
    }

    /// Record the outcome of a single target.
    pub async fn record_target(
        &self,
        execution_id: i64,
        server_id: i64,
        position: i32,
        status: TargetStatus,
        error: Option<&str>,
    ) -> AppResult<ExecutionTarget> {
        queries::execution::insert_target_outcome(
            &self.db,
            execution_id,
            server_id,
            position,
            status.as_str(),
            error,
        )
        .await
    }

    /// Get an execution with its per-target outcomes.
    pub async fn get(&self, execution_id: i64) -> AppResult<ExecutionDetail> {
        let execution = queries::execution::get_execution_by_id(&self.db, execution_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution not found: {}", execution_id)))?;

        let targets = queries::execution::list_target_outcomes(&self.db, execution_id).await?;

        Ok(ExecutionDetail { execution, targets })
    }

    /// List executions, newest first, with optional filters.
    pub async fn list(&self, filter: &ExecutionFilter) -> AppResult<Vec<Execution>> {
        if let Some(state) = &filter.state {
            state
                .parse::<ExecutionState>()
                .map_err(AppError::Validation)?;
        }

        let limit = filter.limit.unwrap_or(50).clamp(1, 100);
        let offset = filter.offset.unwrap_or(0).max(0);

        queries::execution::list_executions(
            &self.db,
            filter.state.as_deref(),
            filter.playbook_id,
            limit,
            offset,
        )
        .await
    }

    /// Count all executions.
    pub async fn count(&self) -> AppResult<i64> {
        queries::execution::count_executions(&self.db).await
    }

    /// Count executions in a given state.
    pub async fn count_by_state(&self, state: &str) -> AppResult<i64> {
        state
            .parse::<ExecutionState>()
            .map_err(AppError::Validation)?;
        queries::execution::count_executions_by_state(&self.db, state).await
    }

    /// Count executions for a playbook.
    pub async fn count_by_playbook(&self, playbook_id: i64) -> AppResult<i64> {
        queries::execution::count_executions_by_playbook(&self.db, playbook_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_default() {
        let filter = ExecutionFilter::default();
        assert!(filter.state.is_none());
        assert!(filter.playbook_id.is_none());
        assert!(filter.limit.is_none());
    }

    #[test]
    fn test_detail_serialization_flattens_execution() {
        let detail = ExecutionDetail {
            execution: Execution {
                id: 7,
                playbook_id: 3,
                requested_by: "ops".to_string(),
                server_ids: vec![1, 2],
                dry_run: false,
                state: "success".to_string(),
                error_kind: None,
                error: None,
                created_at: Utc::now(),
                started_at: Some(Utc::now()),
                finished_at: Some(Utc::now()),
            },
            targets: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["state"], "success");
        assert!(json["targets"].as_array().unwrap().is_empty());
    }
}
