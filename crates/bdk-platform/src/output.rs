//! Backend output storage
//!
//! The only channel through which computed resource identifiers are
//! persisted for downstream consumers (client config generation).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output key of the auth resource group
pub const AUTH_OUTPUT_KEY: &str = "AWS::Amplify::Auth";
/// Output key of the data resource group
pub const GRAPHQL_OUTPUT_KEY: &str = "AWS::Amplify::GraphQL";
/// Output key of the function resource group
pub const FUNCTION_OUTPUT_KEY: &str = "AWS::Amplify::Function";

/// Versioned output payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackendOutputEntry {
    /// Payload schema version
    pub version: String,
    /// Flat string payload
    pub payload: BTreeMap<String, String>,
}

impl BackendOutputEntry {
    /// Create entry with an empty payload
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            payload: BTreeMap::new(),
        }
    }

    /// Add a payload field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Sink for backend outputs
pub trait BackendOutputStorageStrategy: Send + Sync {
    /// Store an entry, replacing any previous entry under `key`
    fn add_backend_output_entry(&self, key: &str, entry: BackendOutputEntry);

    /// Append each payload value to the JSON list stored under the same field
    fn append_to_backend_output_list(&self, key: &str, entry: BackendOutputEntry);
}

/// In-memory output storage
#[derive(Debug, Default)]
pub struct InMemoryBackendOutputStorage {
    entries: RwLock<BTreeMap<String, BackendOutputEntry>>,
}

impl InMemoryBackendOutputStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<BackendOutputEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Decoded list stored in `field` of the entry under `key`
    #[must_use]
    pub fn list(&self, key: &str, field: &str) -> Vec<String> {
        self.entries
            .read()
            .get(key)
            .and_then(|entry| entry.payload.get(field))
            .map(|raw| decode_list(raw))
            .unwrap_or_default()
    }

    /// All stored keys
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl BackendOutputStorageStrategy for InMemoryBackendOutputStorage {
    fn add_backend_output_entry(&self, key: &str, entry: BackendOutputEntry) {
        tracing::debug!(key, version = %entry.version, "storing backend output");
        self.entries.write().insert(key.to_string(), entry);
    }

    fn append_to_backend_output_list(&self, key: &str, entry: BackendOutputEntry) {
        let mut entries = self.entries.write();
        let stored = entries
            .entry(key.to_string())
            .or_insert_with(|| BackendOutputEntry::new(entry.version.clone()));
        stored.version = entry.version;
        for (field, value) in entry.payload {
            let mut list = stored
                .payload
                .get(&field)
                .map(|raw| decode_list(raw))
                .unwrap_or_default();
            list.push(value);
            let encoded = serde_json::to_string(&list).unwrap_or_else(|_| "[]".to_string());
            stored.payload.insert(field, encoded);
        }
    }
}

fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
