//! Playbook catalog service.

use crate::db::models::{Playbook, PlaybookCreateRequest};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};

/// Service for playbook catalog operations.
#[derive(Clone)]
pub struct PlaybookService {
    db: DbPool,
}

impl PlaybookService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Register a playbook.
    pub async fn register(&self, request: PlaybookCreateRequest) -> AppResult<Playbook> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation(
                "playbook name must not be empty".to_string(),
            ));
        }
        if request.playbook_path.trim().is_empty() {
            return Err(AppError::Validation(
                "playbook path must not be empty".to_string(),
            ));
        }

        if queries::playbook::get_playbook_by_name(&self.db, request.name.trim())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "playbook name already exists: {}",
                request.name
            )));
        }

        let playbook = queries::playbook::insert_playbook(
            &self.db,
            request.name.trim(),
            request.playbook_path.trim(),
        )
        .await?;

        tracing::info!(
            playbook_id = playbook.id,
            playbook = %playbook.name,
            "Playbook registered"
        );

        Ok(playbook)
    }

    /// Get a playbook by ID.
    pub async fn get(&self, playbook_id: i64) -> AppResult<Playbook> {
        queries::playbook::get_playbook_by_id(&self.db, playbook_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Playbook not found: {}", playbook_id)))
    }

    /// List all playbooks.
    pub async fn list(&self) -> AppResult<Vec<Playbook>> {
        queries::playbook::list_playbooks(&self.db).await
    }

    /// Count all playbooks.
    pub async fn count(&self) -> AppResult<i64> {
        queries::playbook::count_playbooks(&self.db).await
    }
}
