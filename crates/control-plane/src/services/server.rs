//! Server registry service.
//!
//! Registration inserts the server in `pending` state and kicks off an
//! asynchronous provisioning attempt with the supplied one-time password;
//! the password moves into the spawned task and is dropped after the
//! attempt. Reachability status (online/offline) is owned here and updated
//! by probes, either on demand or by the periodic sweep.

use std::time::Duration;

use crate::db::models::{Server, ServerRegisterRequest};
use crate::db::{queries, DbPool};
use crate::error::{AppError, AppResult};
use crate::services::provision::ProvisionService;

const STATUS_ONLINE: &str = "online";
const STATUS_OFFLINE: &str = "offline";

/// Service for server registry operations.
#[derive(Clone)]
pub struct ServerService {
    db: DbPool,
    provisioner: ProvisionService,
    probe_timeout: Duration,
}

impl ServerService {
    pub fn new(db: DbPool, provisioner: ProvisionService, probe_timeout: Duration) -> Self {
        Self {
            db,
            provisioner,
            probe_timeout,
        }
    }

    /// Register a new server and start provisioning it in the background.
    pub async fn register(&self, mut request: ServerRegisterRequest) -> AppResult<Server> {
        request.name = request.name.trim().to_string();
        request.address = request.address.trim().to_string();
        request.ssh_user = request.ssh_user.trim().to_string();

        if request.name.is_empty() {
            return Err(AppError::Validation("server name must not be empty".to_string()));
        }
        if request.address.is_empty() {
            return Err(AppError::Validation(
                "server address must not be empty".to_string(),
            ));
        }
        if request.ssh_user.is_empty() {
            return Err(AppError::Validation("ssh user must not be empty".to_string()));
        }
        if request.password.is_empty() {
            return Err(AppError::Validation(
                "one-time password must not be empty".to_string(),
            ));
        }
        if request.ssh_port <= 0 || request.ssh_port > i32::from(u16::MAX) {
            return Err(AppError::Validation(format!(
                "invalid ssh port: {}",
                request.ssh_port
            )));
        }

        if queries::server::get_server_by_name(&self.db, &request.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "server name already exists: {}",
                request.name
            )));
        }
        if queries::server::get_server_by_address(&self.db, &request.address)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "server address already in use: {}",
                request.address
            )));
        }

        let server = queries::server::insert_server(
            &self.db,
            &request.name,
            &request.address,
            &request.ssh_user,
            request.ssh_port,
        )
        .await?;

        tracing::info!(
            server_id = server.id,
            server = %server.name,
            "Server registered, provisioning scheduled"
        );

        // The password moves into the task and dies with it.
        let provisioner = self.provisioner.clone();
        let server_id = server.id;
        let password = request.password;
        tokio::spawn(async move {
            if let Err(e) = provisioner.provision(server_id, &password).await {
                tracing::warn!(
                    server_id,
                    error = %e,
                    "Initial provisioning attempt failed; retry with a corrected password"
                );
            }
        });

        Ok(server)
    }

    /// Retry provisioning with a corrected one-time password.
    pub async fn retry_provision(&self, server_id: i64, password: &str) -> AppResult<Server> {
        self.provisioner.retry_provision(server_id, password).await
    }

    /// Get a server by ID.
    pub async fn get(&self, server_id: i64) -> AppResult<Server> {
        queries::server::get_server_by_id(&self.db, server_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))
    }

    /// List all servers.
    pub async fn list(&self) -> AppResult<Vec<Server>> {
        queries::server::list_servers(&self.db).await
    }

    /// List servers by reachability status.
    pub async fn list_by_status(&self, status: &str) -> AppResult<Vec<Server>> {
        queries::server::list_servers_by_status(&self.db, status).await
    }

    /// Count all servers.
    pub async fn count(&self) -> AppResult<i64> {
        queries::server::count_servers(&self.db).await
    }

    /// Count servers by reachability status.
    pub async fn count_by_status(&self, status: &str) -> AppResult<i64> {
        queries::server::count_servers_by_status(&self.db, status).await
    }

    /// Delete a server. Executions that targeted it are retained as audit
    /// trail; new submissions against the id fail validation.
    pub async fn delete(&self, server_id: i64) -> AppResult<()> {
        let deleted = queries::server::delete_server(&self.db, server_id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("Server not found: {}", server_id)));
        }

        tracing::info!(server_id, "Server deleted");
        Ok(())
    }

    /// Probe one server now and persist the observed status.
    pub async fn refresh_status(&self, server_id: i64) -> AppResult<Server> {
        let server = self.get(server_id).await?;
        let online = self.probe(&server).await;
        let status = if online { STATUS_ONLINE } else { STATUS_OFFLINE };

        queries::server::update_status(&self.db, server.id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Server not found: {}", server_id)))
    }

    /// Probe the whole fleet and persist changed statuses.
    pub async fn sweep(&self) -> AppResult<()> {
        let servers = self.list().await?;

        for server in servers {
            let online = self.probe(&server).await;
            let status = if online { STATUS_ONLINE } else { STATUS_OFFLINE };

            if server.status != status {
                tracing::info!(
                    server_id = server.id,
                    server = %server.name,
                    status,
                    "Server reachability changed"
                );
                queries::server::update_status(&self.db, server.id, status).await?;
            }
        }

        Ok(())
    }

    /// TCP probe against the server's SSH port.
    async fn probe(&self, server: &Server) -> bool {
        let addr = format!("{}:{}", server.address, server.ssh_port);
        matches!(
            tokio::time::timeout(self.probe_timeout, tokio::net::TcpStream::connect(&addr)).await,
            Ok(Ok(_))
        )
    }
}
