//! Armada Control Plane Library
//!
//! This crate provides the control plane server for Armada, handling:
//!
//! - **Run Orchestration**: Dispatch playbook runs against target servers
//!   and track their lifecycle through a strict state machine
//! - **SSH Provisioning**: Install the control plane's key on managed
//!   servers using a one-time password, with idempotent retry
//! - **Dynamic Inventory**: Resolve target connection parameters per run,
//!   never persisted
//! - **Execution Ledger**: Durable, append-mostly record of every run with
//!   per-target outcomes
//! - **Metrics**: Normalize, store, and stream per-server samples
//!
//! ## Architecture
//!
//! Every `submit` spawns an independent task that drives the automation
//! engine without blocking the caller; callers poll the execution record to
//! observe progress. Execution state and provisioning status are each
//! mutated through a single choke point (`ExecutionService::transition`,
//! `ProvisionService`), never directly.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`db`]: Database connectivity, models, and queries
//! - [`engine`]: Run orchestrator and automation process runner
//! - [`error`]: Custom error types with Axum integration
//! - [`handlers`]: HTTP route handlers
//! - [`services`]: Business logic services
//! - [`ssh`]: Key generation and remote key installation
//! - [`state`]: Shared application state

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod services;
pub mod ssh;
pub mod state;

pub use error::{AppError, AppResult};
