//! BDK Sandbox - deploy orchestration for sandbox backends
//!
//! [`SandboxExecutor`] serializes deploys requested by a watch loop:
//! - one deploy runs at a time
//! - requests arriving meanwhile collapse into one follow-up deploy that uses
//!   the latest arguments
//! - source validation is decided once per started deploy
//! - the newest secret modification time is passed to the deployer
//!
//! The deploy backend and the secret store are seams
//! ([`BackendDeployer`], [`SecretClient`]).

#![warn(unreachable_pub)]

pub mod config;
pub mod deployer;
pub mod error;
pub mod executor;

pub use config::SandboxConfig;
pub use deployer::{latest_secret_update, BackendDeployer, DeployProps, SecretClient, SecretListItem};
pub use error::{DeploymentError, SandboxError, SecretError};
pub use executor::SandboxExecutor;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
