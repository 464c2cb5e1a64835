//! SSM parameter environment entries
//!
//! Resource identifiers a consumer needs at runtime (user pool ids, API
//! endpoints) are published as parameters; consumers receive the parameter
//! path and resolve the value when they start.

use crate::identifiers::BackendIdentifier;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable name paired with the parameter path holding its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsmEnvironmentEntry {
    /// Environment variable name
    pub name: String,
    /// Parameter path
    pub path: String,
}

/// Publishes parameters and produces the matching environment entries
#[derive(Debug)]
pub struct SsmEnvironmentEntriesGenerator {
    backend_identifier: BackendIdentifier,
    parameters: RwLock<BTreeMap<String, String>>,
}

impl SsmEnvironmentEntriesGenerator {
    /// Create generator for a backend
    #[must_use]
    pub fn new(backend_identifier: BackendIdentifier) -> Self {
        Self {
            backend_identifier,
            parameters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Publish each `(name, value)` pair and return one entry per pair, in order
    pub fn generate_ssm_environment_entries<'a, I>(&self, values: I) -> Vec<SsmEnvironmentEntry>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut parameters = self.parameters.write();
        values
            .into_iter()
            .map(|(name, value)| {
                let path = format!(
                    "/amplify/resource_reference/{}/{name}",
                    self.backend_identifier.to_parameter_path()
                );
                parameters.insert(path.clone(), value.to_string());
                SsmEnvironmentEntry {
                    name: name.to_string(),
                    path,
                }
            })
            .collect()
    }

    /// Value published under a parameter path
    #[must_use]
    pub fn parameter_value(&self, path: &str) -> Option<String> {
        self.parameters.read().get(path).cloned()
    }

    /// Number of published parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.read().len()
    }

    /// Check if nothing was published
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.read().is_empty()
    }
}
