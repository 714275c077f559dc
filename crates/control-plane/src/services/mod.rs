//! Service layer for the Armada Control Plane.
//!
//! Services encapsulate business logic and coordinate
//! between handlers and database queries.

pub mod execution;
pub mod inventory;
pub mod metrics;
pub mod playbook;
pub mod provision;
pub mod server;

pub use execution::ExecutionService;
pub use inventory::InventoryBuilder;
pub use metrics::MetricsService;
pub use playbook::PlaybookService;
pub use provision::ProvisionService;
pub use server::ServerService;
