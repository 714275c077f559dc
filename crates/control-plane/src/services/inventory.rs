//! Dynamic inventory builder.
//!
//! Translates a set of server ids into a connection-ready host list at run
//! time. The inventory is never persisted: it is rebuilt for every run so
//! credential rotation and server edits are picked up automatically.

use serde_json::json;

use crate::db::models::Server;
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};

/// A single resolved target host.
#[derive(Debug, Clone)]
pub struct InventoryHost {
    pub server_id: i64,
    pub name: String,
    pub address: String,
    pub ssh_user: String,
    pub ssh_port: i32,
    pub key_path: String,
}

impl InventoryHost {
    fn from_server(server: &Server) -> AppResult<Self> {
        let key_path = server.key_path.clone().ok_or_else(|| {
            AppError::Precondition(format!(
                "server {} ({}) has no installed key",
                server.id, server.name
            ))
        })?;

        Ok(Self {
            server_id: server.id,
            name: server.name.clone(),
            address: server.address.clone(),
            ssh_user: server.ssh_user.clone(),
            ssh_port: server.ssh_port,
            key_path,
        })
    }
}

/// A resolved per-run inventory, hosts in selection order.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub hosts: Vec<InventoryHost>,
}

impl Inventory {
    /// Render the Ansible dynamic inventory document.
    pub fn to_json(&self) -> serde_json::Value {
        let mut hosts = serde_json::Map::new();
        for host in &self.hosts {
            hosts.insert(
                host.name.clone(),
                json!({
                    "ansible_host": host.address,
                    "ansible_port": host.ssh_port,
                    "ansible_user": host.ssh_user,
                    "ansible_ssh_private_key_file": host.key_path,
                }),
            );
        }

        json!({ "all": { "hosts": hosts } })
    }
}

/// Builds inventories from the credential store.
#[derive(Clone)]
pub struct InventoryBuilder {
    db: DbPool,
}

impl InventoryBuilder {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Resolve `server_ids` into an inventory.
    ///
    /// Fails fast before any run step: unknown ids are `NotFound`, targets
    /// that are not currently `deployed` are `Precondition`.
    pub async fn build(&self, server_ids: &[i64]) -> AppResult<Inventory> {
        let mut hosts = Vec::with_capacity(server_ids.len());

        for &server_id in server_ids {
            let server = queries::server::get_server_by_id(&self.db, server_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))?;

            if !server.is_deployed() {
                return Err(AppError::Precondition(format!(
                    "server {} ({}) is not provisioned (status: {})",
                    server.id, server.name, server.provision_status
                )));
            }

            hosts.push(InventoryHost::from_server(&server)?);
        }

        Ok(Inventory { hosts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, address: &str) -> InventoryHost {
        InventoryHost {
            server_id: 1,
            name: name.to_string(),
            address: address.to_string(),
            ssh_user: "deploy".to_string(),
            ssh_port: 22,
            key_path: "/var/lib/armada/ssh_keys/web-1_ed25519".to_string(),
        }
    }

    #[test]
    fn test_inventory_rendering() {
        let inventory = Inventory {
            hosts: vec![host("web-1", "10.0.0.5"), host("web-2", "10.0.0.6")],
        };

        let doc = inventory.to_json();
        let hosts = doc["all"]["hosts"].as_object().unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts["web-1"]["ansible_host"], "10.0.0.5");
        assert_eq!(hosts["web-1"]["ansible_port"], 22);
        assert_eq!(hosts["web-2"]["ansible_user"], "deploy");
        assert_eq!(
            hosts["web-1"]["ansible_ssh_private_key_file"],
            "/var/lib/armada/ssh_keys/web-1_ed25519"
        );
    }

    #[test]
    fn test_empty_inventory_renders_no_hosts() {
        let inventory = Inventory { hosts: vec![] };
        let doc = inventory.to_json();
        assert!(doc["all"]["hosts"].as_object().unwrap().is_empty());
    }
}
