//! Control plane configuration.

use serde::Deserialize;

/// Settings for the control plane process, read from `ARMADA_*`
/// environment variables:
/// - `ARMADA_HOST`: Server bind address (default: "0.0.0.0")
/// - `ARMADA_PORT`: Server port (default: 8090)
/// - `ARMADA_DEBUG`: Enable debug mode (default: false)
/// - `ARMADA_SSH_KEYS_DIR`: Directory for generated SSH key pairs
/// - `ARMADA_ANSIBLE_PLAYBOOK_BIN`: Automation engine binary
/// - `ARMADA_RUN_TIMEOUT_SECONDS`: Per-target playbook run timeout
/// - `ARMADA_PROVISION_TIMEOUT_SECONDS`: SSH key installation timeout
/// - `ARMADA_PROBE_TIMEOUT_SECONDS`: Reachability probe timeout
/// - `ARMADA_STATUS_SWEEP_INTERVAL`: Online/offline sweep interval in seconds
/// - `ARMADA_METRICS_BUFFER`: Metric stream broadcast buffer size
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Bind address for the HTTP listener
    #[serde(default = "default_host")]
    pub host: String,

    /// Listener port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode
    #[serde(default)]
    pub debug: bool,

    /// Identity reported by the health endpoint
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Directory where generated SSH key pairs are stored
    #[serde(default = "default_ssh_keys_dir")]
    pub ssh_keys_dir: String,

    /// Automation engine binary invoked for playbook runs
    #[serde(default = "default_ansible_playbook_bin")]
    pub ansible_playbook_bin: String,

    /// Per-target playbook run timeout in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,

    /// SSH key installation timeout in seconds
    #[serde(default = "default_provision_timeout")]
    pub provision_timeout_seconds: u64,

    /// Reachability probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    /// Online/offline sweep interval in seconds (0 disables the sweep)
    #[serde(default = "default_sweep_interval")]
    pub status_sweep_interval: u64,

    /// Broadcast buffer size for the live metric stream
    #[serde(default = "default_metrics_buffer")]
    pub metrics_buffer: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_server_name() -> String {
    "armada-control-plane".to_string()
}

fn default_ssh_keys_dir() -> String {
    "ssh_keys".to_string()
}

fn default_ansible_playbook_bin() -> String {
    "ansible-playbook".to_string()
}

fn default_run_timeout() -> u64 {
    600
}

fn default_provision_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_metrics_buffer() -> usize {
    256
}

impl AppConfig {
    /// Load settings from `ARMADA_*` environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("ARMADA_").from_env::<AppConfig>()
    }

    /// `host:port` for the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            ssh_keys_dir: default_ssh_keys_dir(),
            ansible_playbook_bin: default_ansible_playbook_bin(),
            run_timeout_seconds: default_run_timeout(),
            provision_timeout_seconds: default_provision_timeout(),
            probe_timeout_seconds: default_probe_timeout(),
            status_sweep_interval: default_sweep_interval(),
            metrics_buffer: default_metrics_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8090);
        assert!(!config.debug);
        assert_eq!(config.ansible_playbook_bin, "ansible-playbook");
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8090");
    }
}
