//! Execution database model and state machine.
//!
//! An execution is owned exclusively by the orchestrator. Once inserted, the
//! only mutation is the state transition performed through
//! `ExecutionService::transition`, which enforces the machine below. Terminal
//! executions are immutable and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Execution lifecycle state.
///
/// `Dry` doubles as the queued marker for non-dry runs between submission
/// and start; dry-run executions complete directly from `Dry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Submitted; dry-run check in progress, or queued for a real run.
    Dry,
    /// The automation process is executing against targets.
    Running,
    /// Terminal: every target completed without fatal error.
    Success,
    /// Terminal: at least one target failed, or the run itself errored.
    Failed,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Dry => "dry",
            ExecutionState::Running => "running",
            ExecutionState::Success => "success",
            ExecutionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Success | ExecutionState::Failed)
    }

    /// Whether the machine permits moving from `self` to `next`.
    ///
    /// Allowed paths: `dry -> running -> success|failed` for real runs and
    /// `dry -> success|failed` for dry runs. Nothing leaves a terminal state.
    pub fn can_transition(self, next: ExecutionState) -> bool {
        matches!(
            (self, next),
            (ExecutionState::Dry, ExecutionState::Running)
                | (ExecutionState::Dry, ExecutionState::Success)
                | (ExecutionState::Dry, ExecutionState::Failed)
                | (ExecutionState::Running, ExecutionState::Success)
                | (ExecutionState::Running, ExecutionState::Failed)
        )
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry" => Ok(ExecutionState::Dry),
            "running" => Ok(ExecutionState::Running),
            "success" => Ok(ExecutionState::Success),
            "failed" => Ok(ExecutionState::Failed),
            _ => Err(format!("Unknown execution state: {}", s)),
        }
    }
}

/// Failure class for a failed execution.
///
/// Infrastructure failures (missing playbook file, inventory build error,
/// engine unreachable) short-circuit before any target is attempted; target
/// failures aggregate from per-target outcomes. The two need different
/// remediation, so the class is stored alongside the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    Infrastructure,
    Target,
}

impl ExecutionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionErrorKind::Infrastructure => "infrastructure",
            ExecutionErrorKind::Target => "target",
        }
    }
}

impl std::fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single target within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Success,
    Failed,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Success => "success",
            TargetStatus::Failed => "failed",
        }
    }
}

/// Database execution record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Execution {
    /// Primary key.
    pub id: i64,

    /// Playbook reference.
    pub playbook_id: i64,

    /// Identifier of the submitting user (explicit context, no session global).
    pub requested_by: String,

    /// Target server ids in selection order.
    pub server_ids: Vec<i64>,

    /// Whether this is a check-only run.
    pub dry_run: bool,

    /// Current lifecycle state.
    pub state: String,

    /// Failure class ("infrastructure" or "target"), set on failure.
    pub error_kind: Option<String>,

    /// Human-readable failure reason.
    pub error: Option<String>,

    /// Submission timestamp.
    pub created_at: DateTime<Utc>,

    /// When the automation process started (real runs only).
    pub started_at: Option<DateTime<Utc>>,

    /// When the execution reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Parsed lifecycle state. Unknown values read back as `Failed`.
    pub fn state(&self) -> ExecutionState {
        self.state.parse().unwrap_or(ExecutionState::Failed)
    }
}

/// Per-target outcome row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExecutionTarget {
    pub id: i64,
    pub execution_id: i64,
    pub server_id: i64,
    /// Position within the selection order of the submit request.
    pub position: i32,
    pub status: String,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        for state in [
            ExecutionState::Dry,
            ExecutionState::Running,
            ExecutionState::Success,
            ExecutionState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<ExecutionState>(), Ok(state));
        }
        assert!("queued".parse::<ExecutionState>().is_err());
    }

    #[test]
    fn test_allowed_transitions() {
        use ExecutionState::*;

        assert!(Dry.can_transition(Running));
        assert!(Dry.can_transition(Success));
        assert!(Dry.can_transition(Failed));
        assert!(Running.can_transition(Success));
        assert!(Running.can_transition(Failed));
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        use ExecutionState::*;

        for terminal in [Success, Failed] {
            assert!(terminal.is_terminal());
            for next in [Dry, Running, Success, Failed] {
                assert!(!terminal.can_transition(next));
            }
        }
    }

    #[test]
    fn test_no_backward_or_self_transitions() {
        use ExecutionState::*;

        assert!(!Running.can_transition(Dry));
        assert!(!Running.can_transition(Running));
        assert!(!Dry.can_transition(Dry));
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ExecutionErrorKind::Infrastructure.as_str(), "infrastructure");
        assert_eq!(ExecutionErrorKind::Target.as_str(), "target");
    }
}
