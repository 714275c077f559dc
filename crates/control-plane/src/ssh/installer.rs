//! Remote SSH key installation.
//!
//! `KeyInstaller` is the seam between the provisioning workflow and the
//! network: production uses the russh-backed implementation, tests substitute
//! a scripted one. The one-time password only ever lives in the arguments of
//! `install_key`; it is not stored and not logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use russh::ChannelMsg;

use crate::error::{AppError, AppResult};

/// Connection coordinates for a provisioning attempt.
#[derive(Debug, Clone)]
pub struct ProvisionTarget {
    pub address: String,
    pub port: u16,
    pub user: String,
}

/// Installs a public key into a target's authorized_keys.
#[async_trait]
pub trait KeyInstaller: Send + Sync {
    async fn install_key(
        &self,
        target: &ProvisionTarget,
        password: &str,
        public_key: &str,
    ) -> AppResult<()>;
}

/// SSH client handler. Host keys are accepted on first contact: the target
/// was just handed to us by its operator together with its password.
struct AcceptingHandler;

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Production key installer backed by russh.
pub struct SshKeyInstaller {
    timeout: Duration,
}

impl SshKeyInstaller {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(
        &self,
        target: &ProvisionTarget,
        password: &str,
        public_key: &str,
    ) -> AppResult<()> {
        let config = Arc::new(client::Config::default());

        let mut session = client::connect(
            config,
            (target.address.as_str(), target.port),
            AcceptingHandler,
        )
        .await
        .map_err(|e| {
            AppError::Provisioning(format!("failed to reach {}: {}", target.address, e))
        })?;

        let authenticated = session
            .authenticate_password(target.user.as_str(), password)
            .await
            .map_err(|e| AppError::Provisioning(format!("authentication error: {}", e)))?;

        if !authenticated {
            return Err(AppError::Provisioning(format!(
                "authentication rejected for user '{}'",
                target.user
            )));
        }

        let command = format!(
            "mkdir -p ~/.ssh && chmod 700 ~/.ssh && \
             echo '{}' >> ~/.ssh/authorized_keys && chmod 600 ~/.ssh/authorized_keys",
            public_key
        );

        let exit_status = Self::exec(&mut session, &command).await?;
        if exit_status != 0 {
            return Err(AppError::Provisioning(format!(
                "remote key installation exited with status {}",
                exit_status
            )));
        }

        session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .ok();

        Ok(())
    }

    async fn exec(
        session: &mut client::Handle<AcceptingHandler>,
        command: &str,
    ) -> AppResult<u32> {
        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| AppError::Provisioning(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| AppError::Provisioning(format!("failed to exec remote command: {}", e)))?;

        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            if let ChannelMsg::ExitStatus { exit_status: code } = msg {
                exit_status = Some(code);
            }
        }

        exit_status.ok_or_else(|| {
            AppError::Provisioning("remote command returned no exit status".to_string())
        })
    }
}

#[async_trait]
impl KeyInstaller for SshKeyInstaller {
    async fn install_key(
        &self,
        target: &ProvisionTarget,
        password: &str,
        public_key: &str,
    ) -> AppResult<()> {
        tokio::time::timeout(self.timeout, self.run(target, password, public_key))
            .await
            .map_err(|_| {
                AppError::Provisioning(format!(
                    "key installation on {} timed out after {}s",
                    target.address,
                    self.timeout.as_secs()
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_a_provisioning_error() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let installer = SshKeyInstaller::new(Duration::from_millis(200));
        let target = ProvisionTarget {
            address: "192.0.2.1".to_string(),
            port: 22,
            user: "deploy".to_string(),
        };

        let err = installer
            .install_key(&target, "password", "ssh-ed25519 AAAA test")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provisioning");
    }
}
