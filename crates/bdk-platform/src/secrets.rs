//! Backend secrets
//!
//! Secret values are never read at synthesis time. A [`BackendSecretResolver`]
//! turns a [`BackendSecret`] reference into a [`SecretValue`] token that the
//! deployment engine resolves from the parameter store.

use crate::identifiers::BackendIdentifier;
use std::fmt;

/// Reference to a named backend secret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendSecret {
    name: String,
}

impl BackendSecret {
    /// Secret name as stored by the secret client
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Reference a backend secret by name
#[must_use]
pub fn secret(name: impl Into<String>) -> BackendSecret {
    BackendSecret { name: name.into() }
}

/// Deployment-time resolvable secret value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretValue {
    secret_name: String,
    parameter_path: String,
}

impl SecretValue {
    /// Name of the referenced secret
    #[inline]
    #[must_use]
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Parameter path the value is resolved from
    #[inline]
    #[must_use]
    pub fn parameter_path(&self) -> &str {
        &self.parameter_path
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{resolve:ssm-secure:{}}}}}", self.parameter_path)
    }
}

/// Resolves secret references into deployment-time tokens
pub trait BackendSecretResolver: Send + Sync {
    /// Resolve a secret reference
    fn resolve_secret(&self, secret: &BackendSecret) -> SecretValue;
}

/// Resolver scoping every secret under the backend's parameter path
#[derive(Debug, Clone)]
pub struct DefaultBackendSecretResolver {
    backend_identifier: BackendIdentifier,
}

impl DefaultBackendSecretResolver {
    /// Create resolver for a backend
    #[inline]
    #[must_use]
    pub fn new(backend_identifier: BackendIdentifier) -> Self {
        Self { backend_identifier }
    }
}

impl BackendSecretResolver for DefaultBackendSecretResolver {
    fn resolve_secret(&self, secret: &BackendSecret) -> SecretValue {
        SecretValue {
            secret_name: secret.name.clone(),
            parameter_path: format!(
                "/amplify/{}/{}",
                self.backend_identifier.to_parameter_path(),
                secret.name
            ),
        }
    }
}
