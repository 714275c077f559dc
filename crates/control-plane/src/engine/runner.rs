//! Automation process runner.
//!
//! Renders the per-run inventory to a temp file and drives one
//! `ansible-playbook` process per target host, concurrently, each limited to
//! its host and bounded by the run timeout. Per-target failures never abort
//! the other targets; every target is attempted and reports its own outcome.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{AppError, AppResult};
use crate::services::inventory::{Inventory, InventoryHost};

/// How much trailing process output to retain in a failure reason.
const ERROR_TAIL_CHARS: usize = 500;

/// Outcome of running the playbook against one target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub server_id: i64,
    pub host: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Drives the automation engine.
#[derive(Clone)]
pub struct PlaybookRunner {
    ansible_bin: String,
    run_timeout: Duration,
}

impl PlaybookRunner {
    pub fn new(ansible_bin: impl Into<String>, run_timeout: Duration) -> Self {
        Self {
            ansible_bin: ansible_bin.into(),
            run_timeout,
        }
    }

    /// Verify the automation engine is invocable at all.
    ///
    /// Spawn failures here are infrastructure errors and short-circuit the
    /// run before any target is attempted.
    pub async fn preflight(&self) -> AppResult<()> {
        let status = Command::new(&self.ansible_bin)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| {
                AppError::Infrastructure(format!(
                    "automation engine '{}' is not invocable: {}",
                    self.ansible_bin, e
                ))
            })?;

        if !status.success() {
            return Err(AppError::Infrastructure(format!(
                "automation engine '{}' exited with {} during preflight",
                self.ansible_bin, status
            )));
        }

        Ok(())
    }

    /// Run the playbook against every host in the inventory.
    ///
    /// The inventory file is written once and shared; each target process is
    /// limited to its own host so outcomes stay attributable.
    pub async fn run_targets(
        &self,
        playbook_path: &str,
        inventory: &Inventory,
        dry_run: bool,
    ) -> AppResult<Vec<TargetOutcome>> {
        let mut inventory_file = tempfile::Builder::new()
            .prefix("armada-inventory-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| {
                AppError::Infrastructure(format!("failed to create inventory file: {}", e))
            })?;

        serde_json::to_writer(&mut inventory_file, &inventory.to_json()).map_err(|e| {
            AppError::Infrastructure(format!("failed to write inventory file: {}", e))
        })?;

        let inventory_path = inventory_file.path().to_path_buf();

        let runs = inventory
            .hosts
            .iter()
            .map(|host| self.run_one(playbook_path, &inventory_path, host, dry_run));

        let outcomes = futures::future::join_all(runs).await;

        // Keep the temp file alive until every target process has exited.
        drop(inventory_file);

        Ok(outcomes)
    }

    async fn run_one(
        &self,
        playbook_path: &str,
        inventory_path: &Path,
        host: &InventoryHost,
        dry_run: bool,
    ) -> TargetOutcome {
        let mut cmd = Command::new(&self.ansible_bin);
        cmd.arg("-i")
            .arg(inventory_path)
            .arg("--limit")
            .arg(&host.name);
        if dry_run {
            cmd.arg("--check");
        }
        cmd.arg(playbook_path);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        tracing::debug!(
            host = %host.name,
            playbook = %playbook_path,
            dry_run,
            "Launching playbook process"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return TargetOutcome {
                    server_id: host.server_id,
                    host: host.name.clone(),
                    success: false,
                    error: Some(format!("failed to spawn playbook process: {}", e)),
                }
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_handle = tokio::spawn(capture_lines(stdout));
        let stderr_handle = tokio::spawn(capture_lines(stderr));

        let wait_result = match timeout(self.run_timeout, child.wait()).await {
            Ok(result) => result,
            Err(_) => {
                let _ = child.kill().await;
                return TargetOutcome {
                    server_id: host.server_id,
                    host: host.name.clone(),
                    success: false,
                    error: Some(format!(
                        "playbook run timed out after {}s",
                        self.run_timeout.as_secs()
                    )),
                };
            }
        };

        let stdout_text = stdout_handle.await.unwrap_or_default();
        let stderr_text = stderr_handle.await.unwrap_or_default();

        match wait_result {
            Ok(status) if status.success() => TargetOutcome {
                server_id: host.server_id,
                host: host.name.clone(),
                success: true,
                error: None,
            },
            Ok(status) => {
                let detail = if !stderr_text.trim().is_empty() {
                    tail(&stderr_text)
                } else {
                    tail(&stdout_text)
                };
                TargetOutcome {
                    server_id: host.server_id,
                    host: host.name.clone(),
                    success: false,
                    error: Some(format!(
                        "exit code {}: {}",
                        status.code().unwrap_or(-1),
                        detail
                    )),
                }
            }
            Err(e) => TargetOutcome {
                server_id: host.server_id,
                host: host.name.clone(),
                success: false,
                error: Some(format!("failed to wait for playbook process: {}", e)),
            },
        }
    }
}

/// Read lines from a child stream into a string.
async fn capture_lines<R>(stream: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut output = String::new();
    if let Some(stream) = stream {
        let mut reader = BufReader::new(stream).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            output.push_str(&line);
            output.push('\n');
        }
    }
    output
}

/// Trailing slice of process output, trimmed for storage.
fn tail(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= ERROR_TAIL_CHARS {
        return trimmed.to_string();
    }

    let mut start = trimmed.len() - ERROR_TAIL_CHARS;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inventory::InventoryHost;

    fn test_host(name: &str) -> InventoryHost {
        InventoryHost {
            server_id: 1,
            name: name.to_string(),
            address: "127.0.0.1".to_string(),
            ssh_user: "deploy".to_string(),
            ssh_port: 22,
            key_path: "/tmp/test_key".to_string(),
        }
    }

    #[test]
    fn test_tail_short_text() {
        assert_eq!(tail("fatal: unreachable\n"), "fatal: unreachable");
    }

    #[test]
    fn test_tail_long_text_keeps_the_end() {
        let text = "x".repeat(2_000) + "THE END";
        let tailed = tail(&text);
        assert!(tailed.ends_with("THE END"));
        assert!(tailed.len() <= ERROR_TAIL_CHARS);
    }

    #[tokio::test]
    async fn test_preflight_missing_binary_is_infrastructure() {
        let runner = PlaybookRunner::new(
            "/nonexistent/armada-test-ansible",
            Duration::from_secs(5),
        );
        let err = runner.preflight().await.unwrap_err();
        assert_eq!(err.kind(), "infrastructure");
    }

    // Uses `true`/`false` as a stand-in engine: the runner only contracts on
    // spawn + exit code, so any binary exercises the outcome paths.
    #[tokio::test]
    async fn test_run_one_success_and_failure_paths() {
        let inventory = Inventory {
            hosts: vec![test_host("web-1")],
        };

        let ok_runner = PlaybookRunner::new("true", Duration::from_secs(5));
        let outcomes = ok_runner
            .run_targets("site.yml", &inventory, false)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert!(outcomes[0].error.is_none());

        let fail_runner = PlaybookRunner::new("false", Duration::from_secs(5));
        let outcomes = fail_runner
            .run_targets("site.yml", &inventory, false)
            .await
            .unwrap();
        assert!(!outcomes[0].success);
        assert!(outcomes[0].error.as_deref().unwrap().contains("exit code"));
    }

    #[tokio::test]
    async fn test_run_targets_attempts_every_host() {
        let inventory = Inventory {
            hosts: vec![test_host("web-1"), test_host("web-2"), test_host("web-3")],
        };

        let runner = PlaybookRunner::new("true", Duration::from_secs(5));
        let outcomes = runner
            .run_targets("site.yml", &inventory, true)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success));
    }
}
