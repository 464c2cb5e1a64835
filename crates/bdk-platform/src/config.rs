//! Synthesis configuration

use crate::error::Result;
use crate::identifiers::BackendIdentifier;
use serde::{Deserialize, Serialize};

/// Configuration of one backend synthesis
///
/// Every field is optional in TOML; missing fields take their defaults.
///
/// ```toml
/// region = "eu-west-1"
/// account_id = "123456789012"
///
/// [backend_identifier]
/// namespace = "todo-app"
/// name = "alice"
/// type = "sandbox"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Backend being synthesized
    pub backend_identifier: BackendIdentifier,
    /// Deployment region
    pub region: String,
    /// Deployment account
    pub account_id: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backend_identifier: BackendIdentifier::sandbox("bdk-app", "sandbox"),
            region: "us-east-1".to_string(),
            account_id: "000000000000".to_string(),
        }
    }
}

impl SynthesisConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    ///
    /// [`BackendError::InvalidConfig`](crate::BackendError::InvalidConfig) on malformed input.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Set backend identifier
    #[inline]
    #[must_use]
    pub fn with_backend_identifier(mut self, backend_identifier: BackendIdentifier) -> Self {
        self.backend_identifier = backend_identifier;
        self
    }

    /// Set region
    #[inline]
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set account id
    #[inline]
    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::DeploymentType;

    #[test]
    fn parses_partial_toml() {
        let config = SynthesisConfig::from_toml_str(
            r#"
            region = "eu-west-1"

            [backend_identifier]
            namespace = "todo"
            name = "main"
            type = "branch"
            "#,
        )
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.account_id, "000000000000");
        assert_eq!(config.backend_identifier.deployment_type, DeploymentType::Branch);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = SynthesisConfig::from_toml_str("region = ").unwrap_err();
        assert_eq!(err.code(), "InvalidSynthesisConfigError");
    }

    #[test]
    fn builder_methods() {
        let config = SynthesisConfig::new().with_region("ap-south-1").with_account_id("42");
        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.account_id, "42");
    }
}
