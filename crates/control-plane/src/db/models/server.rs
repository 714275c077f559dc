//! Server database model.
//!
//! A server row carries the SSH connection material (user, port, key path)
//! alongside the provisioning status. The one-time password supplied at
//! registration or retry is used for a single provisioning attempt and is
//! never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// SSH key provisioning status for a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    /// Registered, provisioning not yet attempted or still in flight.
    Pending,
    /// The control plane key is installed; terminal for this subsystem.
    Deployed,
    /// The last provisioning attempt failed; retryable.
    Failed,
}

impl ProvisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStatus::Pending => "pending",
            ProvisionStatus::Deployed => "deployed",
            ProvisionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProvisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProvisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProvisionStatus::Pending),
            "deployed" => Ok(ProvisionStatus::Deployed),
            "failed" => Ok(ProvisionStatus::Failed),
            _ => Err(format!("Unknown provision status: {}", s)),
        }
    }
}

/// Database server record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Server {
    /// Primary key.
    pub id: i64,

    /// Server name (unique).
    pub name: String,

    /// Network address (unique).
    pub address: String,

    /// SSH login user.
    pub ssh_user: String,

    /// SSH port.
    pub ssh_port: i32,

    /// Path to the installed private key, set once provisioning succeeds.
    pub key_path: Option<String>,

    /// Provisioning status (pending/deployed/failed).
    pub provision_status: String,

    /// Reason for the last provisioning failure.
    pub provision_error: Option<String>,

    /// Reachability status (online/offline).
    pub status: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Server {
    /// Parsed provisioning status. Unknown values read back as `Pending`.
    pub fn provision_status(&self) -> ProvisionStatus {
        self.provision_status
            .parse()
            .unwrap_or(ProvisionStatus::Pending)
    }

    pub fn is_deployed(&self) -> bool {
        self.provision_status() == ProvisionStatus::Deployed
    }
}

/// Request to register a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRegisterRequest {
    /// Server name.
    pub name: String,

    /// Network address.
    pub address: String,

    /// SSH login user.
    pub ssh_user: String,

    /// SSH port.
    #[serde(default = "default_ssh_port")]
    pub ssh_port: i32,

    /// One-time password used for the initial provisioning attempt.
    /// Consumed by the provisioner, never stored.
    pub password: String,
}

fn default_ssh_port() -> i32 {
    22
}

/// Request to retry provisioning with a corrected one-time password.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRetryRequest {
    pub password: String,
}

/// Server response for the API. The key path stays server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub ssh_user: String,
    pub ssh_port: i32,
    pub provision_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision_error: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Server> for ServerResponse {
    fn from(s: Server) -> Self {
        Self {
            id: s.id,
            name: s.name,
            address: s.address,
            ssh_user: s.ssh_user,
            ssh_port: s.ssh_port,
            provision_status: s.provision_status,
            provision_error: s.provision_error,
            status: s.status,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_status_roundtrip() {
        for status in [
            ProvisionStatus::Pending,
            ProvisionStatus::Deployed,
            ProvisionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ProvisionStatus>(), Ok(status));
        }
        assert!("gone".parse::<ProvisionStatus>().is_err());
    }

    #[test]
    fn test_register_request_default_port() {
        let request: ServerRegisterRequest = serde_json::from_str(
            r#"{"name": "web-1", "address": "10.0.0.5", "ssh_user": "deploy", "password": "x"}"#,
        )
        .unwrap();
        assert_eq!(request.ssh_port, 22);
    }

    #[test]
    fn test_server_response_omits_key_path() {
        let response = ServerResponse {
            id: 1,
            name: "web-1".to_string(),
            address: "10.0.0.5".to_string(),
            ssh_user: "deploy".to_string(),
            ssh_port: 22,
            provision_status: "deployed".to_string(),
            provision_error: None,
            status: "online".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("key_path"));
        assert!(json.contains("deployed"));
    }
}
