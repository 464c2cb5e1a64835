//! Sandbox executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor settings
///
/// ```toml
/// debounce_ms = 100
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Quiet period before a queued deploy starts; `0` starts immediately
    pub debounce_ms: u64,
}

impl SandboxConfig {
    /// Parse TOML configuration
    ///
    /// # Errors
    ///
    /// Returns the parse error on malformed input.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Set the debounce window
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Debounce window, if any
    #[must_use]
    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }
}
