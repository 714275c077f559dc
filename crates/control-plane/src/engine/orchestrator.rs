//! Run orchestrator.
//!
//! `submit` validates the request synchronously (empty target set, unknown
//! playbook or server, unprovisioned target), creates the execution record,
//! and spawns an independent task that drives the run to completion. The
//! caller gets the execution id immediately and observes progress by reading
//! the record; asynchronous failures are recorded, never thrown back.
//!
//! Each submit spawns its own task. Executions are independent rows, so
//! concurrent runs over overlapping server sets never contend with each
//! other; a single execution's transitions serialize through the record
//! store's compare-and-swap.

use crate::db::models::{
    Execution, ExecutionErrorKind, ExecutionState, Playbook, TargetStatus,
};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};
use crate::services::execution::ExecutionService;
use crate::services::inventory::InventoryBuilder;

use super::runner::{PlaybookRunner, TargetOutcome};

/// A run submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub server_ids: Vec<i64>,
    pub dry_run: bool,
    pub requested_by: String,
}

/// Playbook run orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    db: DbPool,
    executions: ExecutionService,
    inventory: InventoryBuilder,
    runner: PlaybookRunner,
}

impl Orchestrator {
    pub fn new(
        db: DbPool,
        executions: ExecutionService,
        inventory: InventoryBuilder,
        runner: PlaybookRunner,
    ) -> Self {
        Self {
            db,
            executions,
            inventory,
            runner,
        }
    }

    /// Submit a run. Returns the created execution immediately; the run
    /// itself proceeds on an independent task.
    pub async fn submit(&self, playbook_id: i64, request: SubmitRequest) -> AppResult<Execution> {
        let server_ids = dedupe_preserving_order(&request.server_ids);

        if server_ids.is_empty() {
            return Err(AppError::Validation(
                "target server set must not be empty".to_string(),
            ));
        }

        let playbook = queries::playbook::get_playbook_by_id(&self.db, playbook_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playbook not found: {}", playbook_id)))?;

        // Every target must exist and be provisioned before any record is
        // created; a bad target rejects the whole submission.
        for &server_id in &server_ids {
            let server = queries::server::get_server_by_id(&self.db, server_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))?;

            if !server.is_deployed() {
                return Err(AppError::Precondition(format!(
                    "server {} ({}) is not provisioned (status: {})",
                    server.id, server.name, server.provision_status
                )));
            }
        }

        let execution = self
            .executions
            .create(playbook.id, &request.requested_by, &server_ids, request.dry_run)
            .await?;

        let orchestrator = self.clone();
        let spawned = execution.clone();
        tokio::spawn(async move {
            orchestrator.run(spawned, playbook).await;
        });

        Ok(execution)
    }

    /// Drive one execution to a terminal state. Errors end up in the record,
    /// not on the submitter's path.
    async fn run(&self, execution: Execution, playbook: Playbook) {
        let execution_id = execution.id;

        if let Err(e) = self.try_run(&execution, &playbook).await {
            tracing::error!(
                execution_id,
                error = %e,
                "Execution finalization failed"
            );
        }
    }

    async fn try_run(&self, execution: &Execution, playbook: &Playbook) -> AppResult<()> {
        // Infrastructure checks first; any failure here short-circuits
        // before a single target is attempted.
        if let Err(e) = self.preflight(playbook).await {
            return self.fail_infrastructure(execution.id, ExecutionState::Dry, e).await;
        }

        let inventory = match self.inventory.build(&execution.server_ids).await {
            Ok(inventory) => inventory,
            Err(e) => {
                return self
                    .fail_infrastructure(execution.id, ExecutionState::Dry, e)
                    .await;
            }
        };

        // Dry runs complete straight from `dry`; real runs pass through
        // `running` while the processes execute.
        let from = if execution.dry_run {
            ExecutionState::Dry
        } else {
            self.executions
                .transition(execution.id, ExecutionState::Dry, ExecutionState::Running, None)
                .await?;
            ExecutionState::Running
        };

        let outcomes = match self
            .runner
            .run_targets(&playbook.playbook_path, &inventory, execution.dry_run)
            .await
        {
            Ok(outcomes) => outcomes,
            Err(e) => return self.fail_infrastructure(execution.id, from, e).await,
        };

        for (position, outcome) in outcomes.iter().enumerate() {
            let status = if outcome.success {
                TargetStatus::Success
            } else {
                TargetStatus::Failed
            };

            self.executions
                .record_target(
                    execution.id,
                    outcome.server_id,
                    position as i32,
                    status,
                    outcome.error.as_deref(),
                )
                .await?;
        }

        self.finalize(execution.id, from, &outcomes).await
    }

    async fn preflight(&self, playbook: &Playbook) -> AppResult<()> {
        if !tokio::fs::try_exists(&playbook.playbook_path)
            .await
            .unwrap_or(false)
        {
            return Err(AppError::Infrastructure(format!(
                "playbook file missing: {}",
                playbook.playbook_path
            )));
        }

        self.runner.preflight().await
    }

    /// Aggregate per-target outcomes: success iff every target succeeded.
    async fn finalize(
        &self,
        execution_id: i64,
        from: ExecutionState,
        outcomes: &[TargetOutcome],
    ) -> AppResult<()> {
        let failed: Vec<&TargetOutcome> = outcomes.iter().filter(|o| !o.success).collect();

        if failed.is_empty() {
            self.executions
                .transition(execution_id, from, ExecutionState::Success, None)
                .await?;
        } else {
            let hosts: Vec<&str> = failed.iter().map(|o| o.host.as_str()).collect();
            self.executions
                .transition(
                    execution_id,
                    from,
                    ExecutionState::Failed,
                    Some((
                        ExecutionErrorKind::Target,
                        format!(
                            "{} of {} targets failed: {}",
                            failed.len(),
                            outcomes.len(),
                            hosts.join(", ")
                        ),
                    )),
                )
                .await?;
        }

        Ok(())
    }

    async fn fail_infrastructure(
        &self,
        execution_id: i64,
        from: ExecutionState,
        error: AppError,
    ) -> AppResult<()> {
        tracing::warn!(
            execution_id,
            error = %error,
            "Execution failed before targets were attempted"
        );

        self.executions
            .transition(
                execution_id,
                from,
                ExecutionState::Failed,
                Some((ExecutionErrorKind::Infrastructure, error.to_string())),
            )
            .await?;

        Ok(())
    }
}

/// Treat the request's server list as an ordered set: duplicates collapse to
/// their first occurrence, selection order is preserved for display.
fn dedupe_preserving_order(server_ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    server_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_preserves_selection_order() {
        assert_eq!(dedupe_preserving_order(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(dedupe_preserving_order(&[]), Vec::<i64>::new());
    }
}
