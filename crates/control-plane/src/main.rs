//! Armada Control Plane Server
//!
//! An async Rust server that orchestrates playbook runs against a fleet of
//! managed servers, provisions SSH access, and streams per-server metrics.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use armada_control_plane::{
    config::{AppConfig, DatabaseConfig},
    db::{create_pool, schema},
    engine::{Orchestrator, PlaybookRunner},
    handlers,
    services::{
        ExecutionService, InventoryBuilder, MetricsService, PlaybookService, ProvisionService,
        ServerService,
    },
    ssh::SshKeyInstaller,
    state::AppState,
};

/// Set up the tracing subscriber; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,armada_control_plane=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Assemble the full route table, one sub-router per domain.
fn build_router(
    state: AppState,
    server_service: ServerService,
    playbook_service: PlaybookService,
    execution_service: ExecutionService,
    metrics_service: MetricsService,
    orchestrator: Orchestrator,
) -> Router {
    // The dashboard is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Health check routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state);

    // Server registry routes
    let server_routes = Router::new()
        .route("/api/servers", post(handlers::servers::register))
        .route("/api/servers", get(handlers::servers::list))
        .route("/api/servers/count/total", get(handlers::servers::count_total))
        .route(
            "/api/servers/count/by-status/{status}",
            get(handlers::servers::count_by_status),
        )
        .route(
            "/api/servers/status/{status}",
            get(handlers::servers::list_by_status),
        )
        .route("/api/servers/{server_id}", get(handlers::servers::get))
        .route("/api/servers/{server_id}", delete(handlers::servers::delete))
        .route(
            "/api/servers/{server_id}/provision/retry",
            post(handlers::servers::retry_provision),
        )
        .route(
            "/api/servers/{server_id}/status/refresh",
            post(handlers::servers::refresh_status),
        )
        .with_state(server_service);

    // Playbook catalog routes
    let playbook_routes = Router::new()
        .route("/api/playbooks", post(handlers::playbooks::register))
        .route("/api/playbooks", get(handlers::playbooks::list))
        .route(
            "/api/playbooks/count/total",
            get(handlers::playbooks::count_total),
        )
        .route("/api/playbooks/{playbook_id}", get(handlers::playbooks::get))
        .with_state(playbook_service);

    // Run submission route
    let run_routes = Router::new()
        .route(
            "/api/playbooks/{playbook_id}/run",
            post(handlers::run_playbook),
        )
        .with_state(orchestrator);

    // Execution read routes
    let execution_routes = Router::new()
        .route("/api/executions", get(handlers::executions::list))
        .route(
            "/api/executions/count/total",
            get(handlers::executions::count_total),
        )
        .route(
            "/api/executions/count/by-state/{state}",
            get(handlers::executions::count_by_state),
        )
        .route(
            "/api/executions/count/by-playbook/{playbook_id}",
            get(handlers::executions::count_by_playbook),
        )
        .route(
            "/api/executions/{execution_id}",
            get(handlers::executions::get),
        )
        .with_state(execution_service);

    // Metrics routes (REST + WebSocket stream)
    let metrics_routes = Router::new()
        .route("/api/metrics", post(handlers::metrics::ingest))
        .route("/api/metrics/latest", get(handlers::metrics::latest))
        .route(
            "/api/servers/{server_id}/metrics",
            get(handlers::metrics::recent),
        )
        .route("/ws/metrics", get(handlers::metrics::stream))
        .route(
            "/ws/metrics/{server_id}",
            get(handlers::metrics::stream_for_server),
        )
        .with_state(metrics_service);

    Router::new()
        .merge(health_routes)
        .merge(server_routes)
        .merge(playbook_routes)
        .merge(run_routes)
        .merge(execution_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Armada Control Plane"
    );

    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "App config unreadable, falling back to defaults");
        AppConfig::default()
    });

    let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Database config unreadable, falling back to defaults");
        DatabaseConfig::default()
    });

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        debug = app_config.debug,
        "Configuration loaded"
    );

    // Create database connection pool and ensure schema
    let db_pool = create_pool(&db_config).await?;
    schema::ensure_schema(&db_pool).await?;

    // Wire up services
    let installer = Arc::new(SshKeyInstaller::new(Duration::from_secs(
        app_config.provision_timeout_seconds,
    )));
    let provision_service = ProvisionService::new(
        db_pool.clone(),
        installer,
        app_config.ssh_keys_dir.clone(),
    );
    let server_service = ServerService::new(
        db_pool.clone(),
        provision_service,
        Duration::from_secs(app_config.probe_timeout_seconds),
    );
    let playbook_service = PlaybookService::new(db_pool.clone());
    let execution_service = ExecutionService::new(db_pool.clone());
    let inventory_builder = InventoryBuilder::new(db_pool.clone());
    let runner = PlaybookRunner::new(
        app_config.ansible_playbook_bin.clone(),
        Duration::from_secs(app_config.run_timeout_seconds),
    );
    let orchestrator = Orchestrator::new(
        db_pool.clone(),
        execution_service.clone(),
        inventory_builder,
        runner,
    );
    let metrics_service = MetricsService::new(db_pool.clone(), app_config.metrics_buffer);

    // Periodic online/offline sweep
    if app_config.status_sweep_interval > 0 {
        let sweep_service = server_service.clone();
        let interval = Duration::from_secs(app_config.status_sweep_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = sweep_service.sweep().await {
                    tracing::warn!(error = %e, "Status sweep failed");
                }
            }
        });
    }

    let state = AppState::new(db_pool, app_config.clone());

    let app = build_router(
        state,
        server_service,
        playbook_service,
        execution_service,
        metrics_service,
        orchestrator,
    );

    let addr: SocketAddr = app_config.bind_address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Control plane stopped");

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl-C received, shutting down");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, shutting down");
        }
    }
}
