//! Construct factory contract
//!
//! A [`ConstructFactory`] is what a `define_*` call returns. It:
//! - records its definition site for import-path diagnostics
//! - guards singleton resource kinds through the [`BuildSession`]
//! - resolves to exactly one shared instance through the [`ConstructContainer`]
//!
//! Cross-resource references go through capability traits implemented for
//! every factory whose output has the matching capability:
//! - [`ResourceAccessGrantee`]: can receive access policies
//! - [`FunctionHandlerFactory`]: resolves to a deployed function
//! - [`AuthResourcesProvider`]: resolves to auth resource handles

use crate::access::ResourceAccessAcceptorFactory;
use crate::container::ConstructContainer;
use crate::error::{BackendError, Result};
use crate::output::BackendOutputStorageStrategy;
use crate::resources::{AuthResources, FunctionResources, ResourceProvider};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use ulid::Ulid;

/// Token under which the auth factory registers itself
pub const AUTH_RESOURCES_TOKEN: &str = "AuthResources";

/// Shared collaborators passed to every `get_instance` call
#[derive(Clone)]
pub struct ConstructFactoryGetInstanceProps {
    /// Singleton registry
    pub construct_container: Arc<ConstructContainer>,
    /// Output sink
    pub output_storage_strategy: Arc<dyn BackendOutputStorageStrategy>,
    /// Optional definition-site check
    pub import_path_verifier: Option<Arc<dyn ImportPathVerifier>>,
    /// Optional resource-name check
    pub resource_name_validator: Option<Arc<dyn ResourceNameValidator>>,
}

impl std::fmt::Debug for ConstructFactoryGetInstanceProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructFactoryGetInstanceProps")
            .field("construct_container", &self.construct_container)
            .field("import_path_verifier", &self.import_path_verifier.is_some())
            .field("resource_name_validator", &self.resource_name_validator.is_some())
            .finish_non_exhaustive()
    }
}

impl ConstructFactoryGetInstanceProps {
    /// Props without optional verifiers
    #[must_use]
    pub fn new(
        construct_container: Arc<ConstructContainer>,
        output_storage_strategy: Arc<dyn BackendOutputStorageStrategy>,
    ) -> Self {
        Self {
            construct_container,
            output_storage_strategy,
            import_path_verifier: None,
            resource_name_validator: None,
        }
    }

    /// Set import path verifier
    #[inline]
    #[must_use]
    pub fn with_import_path_verifier(mut self, verifier: Arc<dyn ImportPathVerifier>) -> Self {
        self.import_path_verifier = Some(verifier);
        self
    }

    /// Set resource name validator
    #[inline]
    #[must_use]
    pub fn with_resource_name_validator(mut self, validator: Arc<dyn ResourceNameValidator>) -> Self {
        self.resource_name_validator = Some(validator);
        self
    }
}

/// Factory returned by a `define_*` call
pub trait ConstructFactory: Send + Sync {
    /// Resource provider produced by this factory
    type Output: Send + Sync + 'static;

    /// Token other factories can discover this one by
    fn provides(&self) -> Option<&'static str> {
        None
    }

    /// Shared instance of this factory's resource provider
    ///
    /// Every call returns the identical `Arc`.
    ///
    /// # Errors
    ///
    /// Import-path, resource-name, validation and construct errors.
    fn get_instance(&self, props: &ConstructFactoryGetInstanceProps) -> Result<Arc<Self::Output>>;

    /// Register this factory under its [`provides`](Self::provides) token
    fn register_provided(self: Arc<Self>, _container: &ConstructContainer)
    where
        Self: Sized,
    {
    }
}

/// Where a `define_*` call was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    /// Source file
    pub file: String,
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl DefinitionSite {
    /// Site of the (track-caller propagated) caller
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Explicit site
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// File path with `/` separators and no extension
    #[must_use]
    pub fn normalized_path(&self) -> String {
        let unix = self.file.replace('\\', "/");
        match unix.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => stem.to_string(),
            _ => unix,
        }
    }

    /// Directory containing the file
    #[must_use]
    pub fn directory(&self) -> Option<String> {
        Path::new(&self.file.replace('\\', "/"))
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// Name of the directory containing the file
    #[must_use]
    pub fn directory_name(&self) -> Option<String> {
        Path::new(&self.file.replace('\\', "/"))
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}

impl From<&Location<'_>> for DefinitionSite {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl std::fmt::Display for DefinitionSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Checks that a resource is defined in its conventional file
pub trait ImportPathVerifier: Send + Sync {
    /// Verify `site` is the file at `expected_path` (without extension)
    ///
    /// # Errors
    ///
    /// [`BackendError::ImportPathMismatch`] carrying `error_message`.
    fn verify(&self, site: &DefinitionSite, expected_path: &str, error_message: &str) -> Result<()>;
}

/// Verifier comparing path suffixes
#[derive(Debug, Default, Clone, Copy)]
pub struct ConventionalImportPathVerifier;

impl ImportPathVerifier for ConventionalImportPathVerifier {
    fn verify(&self, site: &DefinitionSite, expected_path: &str, error_message: &str) -> Result<()> {
        let actual = site.normalized_path();
        let expected = expected_path.replace('\\', "/");
        if actual == expected || actual.ends_with(&format!("/{expected}")) {
            return Ok(());
        }
        Err(BackendError::ImportPathMismatch {
            message: error_message.to_string(),
            found: site.to_string(),
        })
    }
}

/// Validates user supplied resource names
pub trait ResourceNameValidator: Send + Sync {
    /// Validate a name
    ///
    /// # Errors
    ///
    /// [`BackendError::InvalidResourceName`] if the name is not allowed.
    fn validate(&self, name: &str) -> Result<()>;
}

static RESOURCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("resource name regex is valid"));

/// Allows alphanumeric names with `_` and `-`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResourceNameValidator;

impl ResourceNameValidator for DefaultResourceNameValidator {
    fn validate(&self, name: &str) -> Result<()> {
        if RESOURCE_NAME.is_match(name) {
            Ok(())
        } else {
            Err(BackendError::InvalidResourceName {
                name: name.to_string(),
                reason: "only alphanumeric characters, `_` and `-` are allowed".to_string(),
            })
        }
    }
}

/// Singleton resource kind and its duplicate-definition error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingletonKind {
    /// Kind name
    pub name: &'static str,
    /// Duplicate-definition message
    pub message: &'static str,
    /// Duplicate-definition resolution
    pub resolution: &'static str,
}

/// Per-build definition bookkeeping
///
/// Create one session per backend build and pass it to every `define_*`
/// call; independent builds in one process never see each other's counts.
#[derive(Debug)]
pub struct BuildSession {
    id: Ulid,
    definitions: Mutex<HashMap<&'static str, usize>>,
}

impl BuildSession {
    /// Start a session
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Ulid::new(),
            definitions: Mutex::new(HashMap::new()),
        }
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Record a definition of a singleton kind
    ///
    /// The count is raised even when the call fails, so every further
    /// definition fails too.
    ///
    /// # Errors
    ///
    /// [`BackendError::MultipleSingletonResources`] if the kind was already defined.
    pub fn register_singleton(&self, kind: &SingletonKind) -> Result<()> {
        let previous = self.record(kind.name);
        if previous > 0 {
            tracing::warn!(kind = kind.name, session = %self.id, "duplicate singleton definition");
            return Err(BackendError::multiple_singletons(kind.message, kind.resolution));
        }
        Ok(())
    }

    /// Record a definition of a kind that may be defined many times
    ///
    /// Returns the number of earlier definitions of that kind.
    pub fn register_definition(&self, kind: &'static str) -> usize {
        self.record(kind)
    }

    /// Number of definitions of a kind
    #[must_use]
    pub fn definition_count(&self, kind: &str) -> usize {
        self.definitions.lock().get(kind).copied().unwrap_or(0)
    }

    fn record(&self, kind: &'static str) -> usize {
        let mut definitions = self.definitions.lock();
        let count = definitions.entry(kind).or_insert(0);
        let previous = *count;
        *count += 1;
        previous
    }
}

impl Default for BuildSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory whose instance can receive access policies
pub trait ResourceAccessGrantee: Send + Sync {
    /// Acceptor factory of the resolved instance
    ///
    /// # Errors
    ///
    /// Errors from resolving the instance.
    fn resolve_access_acceptor_factory(
        &self,
        props: &ConstructFactoryGetInstanceProps,
    ) -> Result<Arc<dyn ResourceAccessAcceptorFactory>>;
}

impl<F> ResourceAccessGrantee for F
where
    F: ConstructFactory,
    F::Output: ResourceAccessAcceptorFactory,
{
    fn resolve_access_acceptor_factory(
        &self,
        props: &ConstructFactoryGetInstanceProps,
    ) -> Result<Arc<dyn ResourceAccessAcceptorFactory>> {
        let instance: Arc<dyn ResourceAccessAcceptorFactory> = self.get_instance(props)?;
        Ok(instance)
    }
}

/// Factory resolving to a deployed function
pub trait FunctionHandlerFactory: Send + Sync {
    /// Function resources of the resolved instance
    ///
    /// # Errors
    ///
    /// Errors from resolving the instance.
    fn resolve_function_resources(&self, props: &ConstructFactoryGetInstanceProps) -> Result<FunctionResources>;
}

impl<F> FunctionHandlerFactory for F
where
    F: ConstructFactory,
    F::Output: ResourceProvider<Resources = FunctionResources>,
{
    fn resolve_function_resources(&self, props: &ConstructFactoryGetInstanceProps) -> Result<FunctionResources> {
        Ok(self.get_instance(props)?.resources().clone())
    }
}

/// Factory resolving to auth resources
pub trait AuthResourcesProvider: Send + Sync {
    /// Auth resources of the resolved instance
    ///
    /// # Errors
    ///
    /// Errors from resolving the instance.
    fn resolve_auth_resources(&self, props: &ConstructFactoryGetInstanceProps) -> Result<AuthResources>;
}

impl<F> AuthResourcesProvider for F
where
    F: ConstructFactory,
    F::Output: ResourceProvider<Resources = AuthResources>,
{
    fn resolve_auth_resources(&self, props: &ConstructFactoryGetInstanceProps) -> Result<AuthResources> {
        Ok(self.get_instance(props)?.resources().clone())
    }
}
