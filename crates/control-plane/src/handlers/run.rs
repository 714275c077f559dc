//! Run submission handler.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::engine::{Orchestrator, SubmitRequest};
use crate::error::AppError;

/// Request to run a playbook against a set of servers.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    /// Target server ids; selection order is preserved for display.
    pub server_ids: Vec<i64>,

    /// Check-only mode: validate without applying changes.
    #[serde(default)]
    pub dry_run: bool,

    /// Identifier of the submitting user.
    pub requested_by: String,
}

/// Response for a submitted run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub execution_id: i64,
    pub state: String,
    pub message: String,
}

/// Submit a playbook run.
///
/// POST /api/playbooks/{playbook_id}/run
///
/// Returns the execution id immediately; the run proceeds asynchronously.
/// Poll `/api/executions/{execution_id}` to observe progress.
pub async fn run_playbook(
    State(orchestrator): State<Orchestrator>,
    Path(playbook_id): Path<i64>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let execution = orchestrator
        .submit(
            playbook_id,
            SubmitRequest {
                server_ids: request.server_ids,
                dry_run: request.dry_run,
                requested_by: request.requested_by,
            },
        )
        .await?;

    Ok(Json(RunResponse {
        execution_id: execution.id,
        state: execution.state.clone(),
        message: format!(
            "Run submitted. Poll /api/executions/{} for status.",
            execution.id
        ),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_dry_run_defaults_to_false() {
        let request: RunRequest =
            serde_json::from_str(r#"{"server_ids": [1, 2], "requested_by": "ops"}"#).unwrap();
        assert!(!request.dry_run);
        assert_eq!(request.server_ids, vec![1, 2]);
    }

    #[test]
    fn test_run_response_serialization() {
        let response = RunResponse {
            execution_id: 42,
            state: "dry".to_string(),
            message: "Run submitted. Poll /api/executions/42 for status.".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("42"));
        assert!(json.contains("dry"));
    }
}
