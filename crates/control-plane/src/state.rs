//! Shared application state.
//!
//! Domain services carry their own handles and are wired into their routers
//! directly; `AppState` holds only what the cross-cutting handlers (health,
//! startup diagnostics) need.

use crate::config::AppConfig;
use crate::db::DbPool;
use std::sync::Arc;

/// State for cross-cutting handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,

    /// Loaded application configuration.
    pub config: Arc<AppConfig>,

    /// Process start, for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Seconds since the process started serving.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
