//! SSH provisioning service.
//!
//! Single choke point for provisioning status mutations. The workflow:
//! ensure a key pair exists for the server, install the public key over SSH
//! using the caller-supplied one-time password, then mark the server
//! `deployed` (or `failed` with the retained reason). The password is used
//! for exactly one attempt and discarded.
//!
//! Status machine: `pending -> deployed | failed`, `failed -> deployed |
//! failed`. `deployed` is terminal; a retry against a deployed server is a
//! guard error, not a silent re-deploy, so a working key is never clobbered.

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::models::{ProvisionStatus, Server};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};
use crate::ssh::{ensure_keypair, KeyInstaller, ProvisionTarget};

/// Service for SSH key provisioning.
#[derive(Clone)]
pub struct ProvisionService {
    db: DbPool,
    installer: Arc<dyn KeyInstaller>,
    keys_dir: PathBuf,
}

impl ProvisionService {
    pub fn new(db: DbPool, installer: Arc<dyn KeyInstaller>, keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            installer,
            keys_dir: keys_dir.into(),
        }
    }

    /// Run a provisioning attempt for a `pending` or `failed` server.
    ///
    /// On success the server becomes `deployed` and the private key path is
    /// persisted. On failure the server becomes `failed` with the reason
    /// retained, and the error is returned so synchronous callers see it.
    pub async fn provision(&self, server_id: i64, password: &str) -> AppResult<Server> {
        let server = queries::server::get_server_by_id(&self.db, server_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))?;

        guard_not_deployed(&server)?;

        self.attempt(server, password).await
    }

    /// Retry provisioning from `failed` with a corrected password.
    ///
    /// Identical contract to [`provision`](Self::provision); kept as a named
    /// entry point because the retry guard is part of the public API.
    pub async fn retry_provision(&self, server_id: i64, password: &str) -> AppResult<Server> {
        self.provision(server_id, password).await
    }

    async fn attempt(&self, server: Server, password: &str) -> AppResult<Server> {
        tracing::info!(
            server_id = server.id,
            server = %server.name,
            address = %server.address,
            "Starting provisioning attempt"
        );

        match self.install(&server, password).await {
            Ok(key_path) => {
                let updated = queries::server::mark_deployed(&self.db, server.id, &key_path)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Server not found: {}", server.id))
                    })?;

                tracing::info!(
                    server_id = server.id,
                    server = %server.name,
                    "Provisioning succeeded, server deployed"
                );

                Ok(updated)
            }
            Err(err) => {
                let reason = err.to_string();
                queries::server::mark_provision_failed(&self.db, server.id, &reason).await?;

                tracing::warn!(
                    server_id = server.id,
                    server = %server.name,
                    error = %reason,
                    "Provisioning failed"
                );

                Err(err)
            }
        }
    }

    async fn install(&self, server: &Server, password: &str) -> AppResult<String> {
        let key = ensure_keypair(&self.keys_dir, &server.name).await?;

        let target = ProvisionTarget {
            address: server.address.clone(),
            port: u16::try_from(server.ssh_port).unwrap_or(22),
            user: server.ssh_user.clone(),
        };

        self.installer
            .install_key(&target, password, &key.public_key)
            .await?;

        Ok(key.private_key_path.to_string_lossy().into_owned())
    }
}

/// Idempotency guard: provisioning is only re-enterable from `pending` or
/// `failed`.
fn guard_not_deployed(server: &Server) -> AppResult<()> {
    if server.provision_status() == ProvisionStatus::Deployed {
        return Err(AppError::Precondition(format!(
            "server {} ({}) already has a deployed key; delete and re-register to rotate it",
            server.id, server.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::ssh::SshKeyInstaller;

    /// Scripted installer: succeeds only for the expected password.
    struct PasswordCheckingInstaller {
        expected_password: String,
        attempts: AtomicUsize,
    }

    impl PasswordCheckingInstaller {
        fn new(expected_password: &str) -> Self {
            Self {
                expected_password: expected_password.to_string(),
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KeyInstaller for PasswordCheckingInstaller {
        async fn install_key(
            &self,
            _target: &ProvisionTarget,
            password: &str,
            _public_key: &str,
        ) -> AppResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if password == self.expected_password {
                Ok(())
            } else {
                Err(AppError::Provisioning(
                    "authentication rejected for user 'deploy'".to_string(),
                ))
            }
        }
    }

    fn server_with_status(status: &str) -> Server {
        Server {
            id: 7,
            name: "web-1".to_string(),
            address: "10.0.0.5".to_string(),
            ssh_user: "deploy".to_string(),
            ssh_port: 22,
            key_path: None,
            provision_status: status.to_string(),
            provision_error: None,
            status: "offline".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_guard_allows_pending_and_failed() {
        assert!(guard_not_deployed(&server_with_status("pending")).is_ok());
        assert!(guard_not_deployed(&server_with_status("failed")).is_ok());
    }

    #[test]
    fn test_guard_rejects_deployed() {
        let err = guard_not_deployed(&server_with_status("deployed")).unwrap_err();
        assert_eq!(err.kind(), "precondition");
    }

    #[tokio::test]
    async fn test_installer_rejects_wrong_password_then_accepts_corrected_one() {
        let installer = PasswordCheckingInstaller::new("hunter2");
        let target = ProvisionTarget {
            address: "10.0.0.5".to_string(),
            port: 22,
            user: "deploy".to_string(),
        };

        let err = installer
            .install_key(&target, "wrong", "ssh-ed25519 AAAA test")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provisioning");

        installer
            .install_key(&target, "hunter2", "ssh-ed25519 AAAA test")
            .await
            .unwrap();

        assert_eq!(installer.attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_key_installer_is_object_safe() {
        let installer: Arc<dyn KeyInstaller> =
            Arc::new(SshKeyInstaller::new(Duration::from_secs(1)));
        drop(installer);
    }
}
