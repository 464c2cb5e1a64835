//! Function configuration
//!
//! Numeric settings are taken as `f64` so fractional input can be reported
//! back verbatim by validation.

use bdk_platform::{BackendSecret, LogFormat, LogLevel, LogRetention};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentValue {
    /// Literal value
    Plain(String),
    /// Secret read from the parameter store at runtime
    Secret(BackendSecret),
}

impl From<&str> for EnvironmentValue {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

impl From<String> for EnvironmentValue {
    fn from(value: String) -> Self {
        Self::Plain(value)
    }
}

impl From<BackendSecret> for EnvironmentValue {
    fn from(value: BackendSecret) -> Self {
        Self::Secret(value)
    }
}

/// Instruction set the function runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Architecture {
    /// ARM
    #[serde(rename = "arm64")]
    Arm64,
    /// x86
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Architecture {
    /// Architecture name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Function log settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionLogging {
    /// Record format
    pub format: Option<LogFormat>,
    /// Application log level
    pub level: Option<LogLevel>,
    /// Log group retention
    pub retention: Option<LogRetention>,
}

/// Configuration passed to `define_function`
#[derive(Debug, Clone, Default)]
pub struct FunctionProps {
    /// Function name; defaults to the entry file stem or the definition directory
    pub name: Option<String>,
    /// Handler path relative to the definition site
    pub entry: Option<String>,
    /// Timeout in seconds
    pub timeout_seconds: Option<f64>,
    /// Memory in MB
    pub memory_mb: Option<f64>,
    /// Ephemeral storage in MB
    pub ephemeral_storage_size_mb: Option<f64>,
    /// Environment variables, in declaration order
    pub environment: IndexMap<String, EnvironmentValue>,
    /// Runtime major version
    pub runtime: Option<u32>,
    /// Architecture name
    pub architecture: Option<String>,
    /// Schedules as rates (`every 5m`) or cron expressions
    pub schedule: Vec<String>,
    /// Logging
    pub logging: FunctionLogging,
}

impl FunctionProps {
    /// Default props
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set entry
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout: f64) -> Self {
        self.timeout_seconds = Some(timeout);
        self
    }

    /// Set memory
    #[must_use]
    pub fn with_memory_mb(mut self, memory: f64) -> Self {
        self.memory_mb = Some(memory);
        self
    }

    /// Set ephemeral storage
    #[must_use]
    pub fn with_ephemeral_storage_size_mb(mut self, size: f64) -> Self {
        self.ephemeral_storage_size_mb = Some(size);
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<EnvironmentValue>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set runtime
    #[must_use]
    pub fn with_runtime(mut self, runtime: u32) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set architecture
    #[must_use]
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = Some(architecture.into());
        self
    }

    /// Add a schedule
    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule.push(schedule.into());
        self
    }

    /// Set logging
    #[must_use]
    pub fn with_logging(mut self, logging: FunctionLogging) -> Self {
        self.logging = logging;
        self
    }
}
