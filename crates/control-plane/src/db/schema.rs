//! Schema bootstrap.
//!
//! Applies the DDL from `migrations/0001_init.sql` at startup. All statements
//! are idempotent (`IF NOT EXISTS`), so this is safe to run on every boot.

use crate::db::DbPool;
use crate::error::AppResult;

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

/// Ensure the armada schema and tables exist.
pub async fn ensure_schema(pool: &DbPool) -> AppResult<()> {
    sqlx::raw_sql(INIT_SQL).execute(pool).await?;
    tracing::info!("Database schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sql_embedded() {
        assert!(INIT_SQL.contains("CREATE SCHEMA IF NOT EXISTS armada"));
        assert!(INIT_SQL.contains("armada.execution"));
        assert!(INIT_SQL.contains("armada.metric"));
    }
}
