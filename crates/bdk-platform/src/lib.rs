//! BDK Platform - the composition engine under every `define_*` call
//!
//! Provides:
//! - [`ConstructContainer`]: lazily computed, identity-preserving singletons
//! - [`ConstructFactory`] and [`BuildSession`]: the factory contract and
//!   per-build duplicate-definition guard
//! - [`AccessBuilder`] and [`AccessPolicyArbiter`]: declarative access grants
//!   turned into one attached policy per grant
//! - resource handles, IAM model, output storage, secrets and SSM entries
//!
//! # Example
//!
//! ```rust,ignore
//! use bdk_platform::prelude::*;
//!
//! let session = BuildSession::new();
//! let auth = bdk_auth::define_auth(&session, AuthProps::email())?;
//!
//! let mut backend = Backend::new(&SynthesisConfig::default());
//! backend.add("auth", auth);
//! backend.synthesize()?;
//! ```

#![warn(unreachable_pub)]

pub mod access;
pub mod backend;
pub mod config;
pub mod construct;
pub mod container;
pub mod error;
pub mod factory;
pub mod iam;
pub mod identifiers;
pub mod logging;
pub mod output;
pub mod resources;
pub mod secrets;
pub mod ssm;

pub use access::{
    access, AccessAction, AccessBuilder, AccessGenerator, AccessPolicyArbiter, AccessPolicyFactory,
    ResourceAccessAcceptor, ResourceAccessAcceptorFactory, ResourceAccessGrant,
};
pub use backend::{construct_container_for, Backend, BackendResource};
pub use config::SynthesisConfig;
pub use construct::{resource_group, Stack, StackResolver, Tags, FRIENDLY_NAME_TAG_KEY};
pub use container::{
    ConstructContainer, ConstructContainerEntryGenerator, GenerateContainerEntryProps, GeneratorId,
};
pub use error::{BackendError, ConstructError, Result};
pub use factory::{
    AuthResourcesProvider, BuildSession, ConstructFactory, ConstructFactoryGetInstanceProps,
    ConventionalImportPathVerifier, DefaultResourceNameValidator, DefinitionSite,
    FunctionHandlerFactory, ImportPathVerifier, ResourceAccessGrantee, ResourceNameValidator,
    SingletonKind, AUTH_RESOURCES_TOKEN,
};
pub use iam::{merge_statements, Policy, PolicyStatement, Role};
pub use identifiers::{BackendIdentifier, DeploymentType, StableBackendIdentifiers};
pub use logging::{LogFormat, LogLevel, LogRetention};
pub use output::{
    BackendOutputEntry, BackendOutputStorageStrategy, InMemoryBackendOutputStorage,
    AUTH_OUTPUT_KEY, FUNCTION_OUTPUT_KEY, GRAPHQL_OUTPUT_KEY,
};
pub use resources::{
    AuthResources, FunctionResources, LambdaFunction, ResourceProvider, StackProvider, UserPool,
    UserPoolGroup,
};
pub use secrets::{secret, BackendSecret, BackendSecretResolver, DefaultBackendSecretResolver, SecretValue};
pub use ssm::{SsmEnvironmentEntriesGenerator, SsmEnvironmentEntry};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining backends
    pub use crate::{
        access, secret, AccessBuilder, Backend, BackendError, BuildSession, ConstructFactory,
        ConstructFactoryGetInstanceProps, ResourceAccessGrantee, ResourceProvider, SynthesisConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
