//! SSH key pair generation.
//!
//! One Ed25519 key pair per server, stored under the configured keys
//! directory as `<server>_ed25519` / `<server>_ed25519.pub`. Generation is
//! idempotent: an existing pair is reused so a provisioning retry installs
//! the same public key.

use std::path::{Path, PathBuf};

use russh_keys::{key::KeyPair, PublicKeyBase64};

use crate::error::{AppError, AppResult};

/// Comment appended to generated public key lines.
const KEY_COMMENT: &str = "armada-control-plane";

/// A generated (or reloaded) key pair on disk.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// Path to the private key file (PKCS#8 PEM, mode 0600).
    pub private_key_path: PathBuf,

    /// Public key in OpenSSH authorized_keys format.
    pub public_key: String,
}

/// Ensure a key pair exists for `server_name`, generating one if needed.
pub async fn ensure_keypair(keys_dir: &Path, server_name: &str) -> AppResult<GeneratedKey> {
    tokio::fs::create_dir_all(keys_dir).await?;

    let private_key_path = keys_dir.join(format!("{}_ed25519", server_name));
    let public_key_path = keys_dir.join(format!("{}_ed25519.pub", server_name));

    if tokio::fs::try_exists(&private_key_path).await? {
        let public_key = tokio::fs::read_to_string(&public_key_path)
            .await
            .map_err(|e| {
                AppError::Provisioning(format!(
                    "private key exists but public key is unreadable: {}",
                    e
                ))
            })?;

        return Ok(GeneratedKey {
            private_key_path,
            public_key: public_key.trim().to_string(),
        });
    }

    let keypair = KeyPair::generate_ed25519()
        .ok_or_else(|| AppError::Provisioning("key generation failed".to_string()))?;

    let mut pem = Vec::new();
    russh_keys::encode_pkcs8_pem(&keypair, &mut pem)
        .map_err(|e| AppError::Provisioning(format!("failed to encode private key: {}", e)))?;

    let public_key = format!(
        "{} {} {}",
        keypair.name(),
        keypair.public_key_base64(),
        KEY_COMMENT
    );

    tokio::fs::write(&private_key_path, &pem).await?;
    restrict_permissions(&private_key_path).await?;
    tokio::fs::write(&public_key_path, format!("{}\n", public_key)).await?;

    tracing::info!(
        server = %server_name,
        path = %private_key_path.display(),
        "Generated SSH key pair"
    );

    Ok(GeneratedKey {
        private_key_path,
        public_key,
    })
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> AppResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_and_reuse_keypair() {
        let dir = tempfile::tempdir().unwrap();

        let first = ensure_keypair(dir.path(), "web-1").await.unwrap();
        assert!(first.public_key.starts_with("ssh-ed25519 "));
        assert!(first.public_key.ends_with(KEY_COMMENT));
        assert!(first.private_key_path.exists());

        // Second call must reuse the existing pair, not rotate it.
        let second = ensure_keypair(dir.path(), "web-1").await.unwrap();
        assert_eq!(first.public_key, second.public_key);
        assert_eq!(first.private_key_path, second.private_key_path);
    }

    #[tokio::test]
    async fn test_distinct_servers_get_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();

        let a = ensure_keypair(dir.path(), "web-1").await.unwrap();
        let b = ensure_keypair(dir.path(), "web-2").await.unwrap();
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.private_key_path, b.private_key_path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_private_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let key = ensure_keypair(dir.path(), "web-1").await.unwrap();

        let mode = std::fs::metadata(&key.private_key_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
