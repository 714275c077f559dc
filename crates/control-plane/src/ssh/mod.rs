//! SSH provisioning primitives.
//!
//! Key pair generation and remote key installation live here; the
//! provisioning workflow itself (status transitions, retry guard) is in
//! `services::provision`.

pub mod installer;
pub mod keys;

pub use installer::{KeyInstaller, ProvisionTarget, SshKeyInstaller};
pub use keys::{ensure_keypair, GeneratedKey};
