//! Playbook database model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Inventory mode marker. The stored value is metadata only: the real
/// inventory is generated per run, never read back from this field.
pub const INVENTORY_MODE_DYNAMIC: &str = "dynamic";

/// Database playbook record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Playbook {
    /// Primary key.
    pub id: i64,

    /// Display name (unique).
    pub name: String,

    /// Path to the automation script artifact.
    pub playbook_path: String,

    /// Inventory mode, always "dynamic".
    pub inventory_mode: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Request to register a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookCreateRequest {
    /// Display name.
    pub name: String,

    /// Path to the automation script artifact.
    pub playbook_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playbook_serialization() {
        let playbook = Playbook {
            id: 3,
            name: "deploy-nginx".to_string(),
            playbook_path: "/opt/playbooks/nginx.yml".to_string(),
            inventory_mode: INVENTORY_MODE_DYNAMIC.to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&playbook).unwrap();
        assert!(json.contains("deploy-nginx"));
        assert!(json.contains("dynamic"));
    }
}
