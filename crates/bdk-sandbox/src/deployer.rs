//! Seams to the deploy backend and the secret store

use crate::error::{DeploymentError, SecretError};
use bdk_platform::BackendIdentifier;
use chrono::{DateTime, Utc};

/// Options of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeployProps {
    /// Credentials profile
    pub profile: Option<String>,
    /// Newest secret modification, for cache invalidation downstream
    pub secret_last_updated: Option<DateTime<Utc>>,
    /// Run full source validation before deploying
    pub validate_app_sources: bool,
}

/// Deploys and destroys backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BackendDeployer: Send + Sync {
    /// Deploy the backend
    async fn deploy(&self, backend_identifier: &BackendIdentifier, props: DeployProps) -> Result<(), DeploymentError>;

    /// Tear the backend down
    async fn destroy(&self, backend_identifier: &BackendIdentifier) -> Result<(), DeploymentError>;
}

/// Secret metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretListItem {
    /// Secret name
    pub name: String,
    /// Last modification, when known
    pub last_updated: Option<DateTime<Utc>>,
}

/// Lists secrets of a backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SecretClient: Send + Sync {
    /// Secrets of the backend
    async fn list_secrets(&self, backend_identifier: &BackendIdentifier) -> Result<Vec<SecretListItem>, SecretError>;
}

/// Newest modification time among `secrets`
#[must_use]
pub fn latest_secret_update(secrets: &[SecretListItem]) -> Option<DateTime<Utc>> {
    secrets.iter().filter_map(|s| s.last_updated).max()
}
