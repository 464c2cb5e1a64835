//! Error types for the backend platform
//!
//! Every user-facing failure carries:
//! - a stable error code (`code()`), e.g. `MultipleSingletonResourcesError`
//! - a short message (the `Display` output)
//! - an actionable resolution hint (`resolution()`)
//!
//! Failures of the underlying infrastructure constructs are reported as
//! [`ConstructError`] and wrapped into
//! [`BackendError::ConstructInitialization`] by the entry generators.

/// Result alias used across the platform crates
pub type Result<T, E = BackendError> = std::result::Result<T, E>;

/// Main backend definition error type
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A singleton resource kind was defined more than once
    #[error("{message}")]
    MultipleSingletonResources {
        /// Which `define*` call is duplicated
        message: String,
        /// How to fix it
        resolution: String,
    },

    /// User configuration failed validation
    #[error("{message}")]
    Configuration {
        /// Stable error name
        code: &'static str,
        /// What is wrong
        message: String,
        /// How to fix it
        resolution: String,
    },

    /// The underlying infrastructure construct rejected its input
    #[error("{message}")]
    ConstructInitialization {
        /// Stable error name naming the resource kind
        code: &'static str,
        /// What failed
        message: String,
        /// How to fix it
        resolution: String,
        /// Construct failure
        #[source]
        source: ConstructError,
    },

    /// An access acceptor was requested for a role that does not exist
    #[error("{message}")]
    InvalidResourceAccessConfig {
        /// What is wrong
        message: String,
        /// How to fix it
        resolution: String,
    },

    /// A resource was defined outside its conventional file
    #[error("{message}")]
    ImportPathMismatch {
        /// Expected location
        message: String,
        /// Where the definition was actually found
        found: String,
    },

    /// A user supplied resource name is not allowed
    #[error("resource name `{name}` is invalid: {reason}")]
    InvalidResourceName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A generator requested its own entry while computing it
    #[error("cyclic construct resolution: {}", path.join(" -> "))]
    CyclicDependency {
        /// Resource groups on the resolution stack, ending with the repeated one
        path: Vec<String>,
    },

    /// A container entry exists under this identity with another type
    #[error("container entry for resource group `{0}` holds an unexpected type")]
    EntryTypeMismatch(String),

    /// Configuration file could not be parsed
    #[error("invalid synthesis configuration: {0}")]
    InvalidConfig(#[from] toml::de::Error),
}

impl BackendError {
    /// Build a configuration error
    #[inline]
    pub fn configuration(
        code: &'static str,
        message: impl Into<String>,
        resolution: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
            resolution: resolution.into(),
        }
    }

    /// Build a duplicate-definition error
    #[inline]
    pub fn multiple_singletons(message: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self::MultipleSingletonResources {
            message: message.into(),
            resolution: resolution.into(),
        }
    }

    /// Wrap a construct failure for the given resource kind
    ///
    /// `kind` is the capitalised resource kind, e.g. `Auth` produces
    /// `AmplifyAuthConstructInitializationError`.
    pub fn construct_initialization(kind: &str, source: ConstructError) -> Self {
        let code = match kind {
            "Auth" => "AmplifyAuthConstructInitializationError",
            "Data" => "AmplifyDataConstructInitializationError",
            "Function" => "AmplifyFunctionConstructInitializationError",
            _ => "ConstructInitializationError",
        };
        Self::ConstructInitialization {
            code,
            message: format!("Failed to instantiate {} construct", kind.to_lowercase()),
            resolution: "See the underlying error message for more details.".to_string(),
            source,
        }
    }

    /// Stable name of this error
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::MultipleSingletonResources { .. } => "MultipleSingletonResourcesError",
            Self::Configuration { code, .. } | Self::ConstructInitialization { code, .. } => *code,
            Self::InvalidResourceAccessConfig { .. } => "InvalidResourceAccessConfigError",
            Self::ImportPathMismatch { .. } => "ImportPathVerificationError",
            Self::InvalidResourceName { .. } => "InvalidResourceNameError",
            Self::CyclicDependency { .. } => "CyclicConstructResolutionError",
            Self::EntryTypeMismatch(_) => "ConstructContainerEntryTypeError",
            Self::InvalidConfig(_) => "InvalidSynthesisConfigError",
        }
    }

    /// Actionable hint for the user, if this error has one
    #[must_use]
    pub fn resolution(&self) -> Option<&str> {
        match self {
            Self::MultipleSingletonResources { resolution, .. }
            | Self::Configuration { resolution, .. }
            | Self::ConstructInitialization { resolution, .. }
            | Self::InvalidResourceAccessConfig { resolution, .. } => Some(resolution.as_str()),
            Self::ImportPathMismatch { .. } => {
                Some("Move the definition into the expected file and re-export it from there.")
            }
            Self::InvalidResourceName { .. } => {
                Some("Use only alphanumeric characters, underscores and hyphens in resource names.")
            }
            Self::CyclicDependency { .. } => {
                Some("Remove the access grant or trigger that makes a resource depend on itself.")
            }
            Self::EntryTypeMismatch(_) | Self::InvalidConfig(_) => None,
        }
    }

    /// Check if error is caused by user input
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::EntryTypeMismatch(_))
    }
}

/// Failures raised by infrastructure construct models
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructError {
    /// Construct properties are inconsistent
    #[error("{0}")]
    InvalidProps(String),

    /// A lifecycle trigger is already attached for this event
    #[error("a `{event}` trigger is already attached to user pool `{user_pool}`")]
    DuplicateTrigger {
        /// Lifecycle event name
        event: String,
        /// Owning user pool
        user_pool: String,
    },

    /// A resource with this logical id already exists in the stack
    #[error("There is already a resource with logical id `{logical_id}` in stack `{stack}`")]
    DuplicateLogicalId {
        /// Logical id of the rejected resource
        logical_id: String,
        /// Owning stack
        stack: String,
    },
}

impl ConstructError {
    /// Build an invalid-props error
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidProps(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn construct_initialization_keeps_source() {
        let err = BackendError::construct_initialization(
            "Auth",
            ConstructError::invalid("At least one of email or phone must be enabled."),
        );

        assert_eq!(err.code(), "AmplifyAuthConstructInitializationError");
        assert_eq!(err.to_string(), "Failed to instantiate auth construct");
        assert_eq!(
            err.source().map(|e| e.to_string()).as_deref(),
            Some("At least one of email or phone must be enabled.")
        );
    }

    #[test]
    fn cyclic_dependency_renders_path() {
        let err = BackendError::CyclicDependency {
            path: vec!["auth".into(), "function".into(), "auth".into()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic construct resolution: auth -> function -> auth"
        );
        assert!(err.resolution().is_some());
    }

    #[test]
    fn configuration_error_exposes_code() {
        let err = BackendError::configuration("InvalidMemoryMBError", "bad", "fix it");
        assert_eq!(err.code(), "InvalidMemoryMBError");
        assert_eq!(err.resolution(), Some("fix it"));
        assert!(err.is_user_error());
    }
}
