//! Backend identity
//!
//! - [`BackendIdentifier`]: namespace, name and deployment type of one backend
//! - [`StableBackendIdentifiers`]: deterministic hashes derived from that identity,
//!   used wherever a value must be globally unique (OAuth domain prefixes,
//!   physical resource ids)

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex encoded stable backend hash
pub const STABLE_BACKEND_HASH_LENGTH: usize = 20;

/// How a backend is deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    /// Per-developer iterative deployment
    #[default]
    Sandbox,
    /// Pipeline deployment of a source branch
    Branch,
}

impl DeploymentType {
    /// Lowercase name used in paths and stack names
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Branch => "branch",
        }
    }
}

impl std::fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one backend deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendIdentifier {
    /// Project or app identifier
    pub namespace: String,
    /// Sandbox owner or branch name
    pub name: String,
    /// Deployment type
    #[serde(rename = "type")]
    pub deployment_type: DeploymentType,
}

impl BackendIdentifier {
    /// Identifier of a sandbox backend
    #[must_use]
    pub fn sandbox(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            deployment_type: DeploymentType::Sandbox,
        }
    }

    /// Identifier of a branch backend
    #[must_use]
    pub fn branch(app_id: impl Into<String>, branch_name: impl Into<String>) -> Self {
        Self {
            namespace: app_id.into(),
            name: branch_name.into(),
            deployment_type: DeploymentType::Branch,
        }
    }

    /// Parameter-store path segment for this backend
    #[must_use]
    pub fn to_parameter_path(&self) -> String {
        format!("{}/{}-{}", self.namespace, self.name, self.deployment_type)
    }

    /// Name of the root stack that holds this backend
    #[must_use]
    pub fn to_stack_name(&self) -> String {
        format!(
            "amplify-{}-{}-{}",
            self.namespace, self.name, self.deployment_type
        )
    }
}

impl std::fmt::Display for BackendIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.name, self.deployment_type)
    }
}

/// Deterministic identifiers derived from a [`BackendIdentifier`]
#[derive(Debug, Clone)]
pub struct StableBackendIdentifiers {
    backend_identifier: BackendIdentifier,
    hash: String,
}

impl StableBackendIdentifiers {
    /// Derive identifiers for a backend
    #[must_use]
    pub fn new(backend_identifier: BackendIdentifier) -> Self {
        let hash = digest_hex(&[
            backend_identifier.namespace.as_bytes(),
            backend_identifier.name.as_bytes(),
            backend_identifier.deployment_type.as_str().as_bytes(),
        ]);
        Self {
            backend_identifier,
            hash,
        }
    }

    /// Stable, lowercase hex hash of the backend identity
    #[inline]
    #[must_use]
    pub fn get_stable_backend_hash(&self) -> &str {
        &self.hash
    }

    /// Stable id for a named resource within this backend
    #[must_use]
    pub fn resource_id(&self, resource_name: &str) -> String {
        digest_hex(&[self.hash.as_bytes(), resource_name.as_bytes()])
    }

    /// Backend these identifiers were derived from
    #[inline]
    #[must_use]
    pub fn backend_identifier(&self) -> &BackendIdentifier {
        &self.backend_identifier
    }
}

fn digest_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(STABLE_BACKEND_HASH_LENGTH);
    encoded
}
