//! Backend composition
//!
//! [`Backend`] collects the factories returned by `define_*` calls, registers
//! the capability tokens they provide, and resolves every factory in
//! insertion order when synthesized.

use crate::config::SynthesisConfig;
use crate::construct::StackResolver;
use crate::container::ConstructContainer;
use crate::error::Result;
use crate::factory::{ConstructFactory, ConstructFactoryGetInstanceProps, ImportPathVerifier, ResourceNameValidator};
use crate::identifiers::StableBackendIdentifiers;
use crate::output::InMemoryBackendOutputStorage;
use crate::secrets::DefaultBackendSecretResolver;
use crate::ssm::SsmEnvironmentEntriesGenerator;
use indexmap::IndexMap;
use std::sync::Arc;

/// Anything a backend can synthesize
pub trait BackendResource: Send + Sync {
    /// Resolve the resource
    ///
    /// # Errors
    ///
    /// Errors from resolving the resource.
    fn synthesize(&self, props: &ConstructFactoryGetInstanceProps) -> Result<()>;
}

impl<F: ConstructFactory> BackendResource for F {
    fn synthesize(&self, props: &ConstructFactoryGetInstanceProps) -> Result<()> {
        self.get_instance(props).map(|_| ())
    }
}

/// Container wired for a synthesis configuration
#[must_use]
pub fn construct_container_for(config: &SynthesisConfig) -> ConstructContainer {
    let backend_identifier = config.backend_identifier.clone();
    ConstructContainer::new(
        StackResolver::new(
            backend_identifier.to_stack_name(),
            config.region.clone(),
            config.account_id.clone(),
        ),
        Arc::new(DefaultBackendSecretResolver::new(backend_identifier.clone())),
        SsmEnvironmentEntriesGenerator::new(backend_identifier.clone()),
        StableBackendIdentifiers::new(backend_identifier),
    )
}

/// A backend under definition
pub struct Backend {
    get_instance_props: ConstructFactoryGetInstanceProps,
    output_storage: Arc<InMemoryBackendOutputStorage>,
    resources: IndexMap<String, Arc<dyn BackendResource>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Create backend for a configuration
    #[must_use]
    pub fn new(config: &SynthesisConfig) -> Self {
        let output_storage = Arc::new(InMemoryBackendOutputStorage::new());
        let get_instance_props = ConstructFactoryGetInstanceProps::new(
            Arc::new(construct_container_for(config)),
            output_storage.clone(),
        );
        Self {
            get_instance_props,
            output_storage,
            resources: IndexMap::new(),
        }
    }

    /// Verify definition sites of every resource
    #[must_use]
    pub fn with_import_path_verifier(mut self, verifier: Arc<dyn ImportPathVerifier>) -> Self {
        self.get_instance_props.import_path_verifier = Some(verifier);
        self
    }

    /// Validate every user supplied resource name
    #[must_use]
    pub fn with_resource_name_validator(mut self, validator: Arc<dyn ResourceNameValidator>) -> Self {
        self.get_instance_props.resource_name_validator = Some(validator);
        self
    }

    /// Add a resource under `name`
    ///
    /// Factories providing a capability token are registered immediately, so
    /// resources added earlier can discover resources added later.
    pub fn add<F>(&mut self, name: impl Into<String>, factory: Arc<F>) -> &mut Self
    where
        F: ConstructFactory + 'static,
    {
        let name = name.into();
        if let Some(token) = factory.provides() {
            tracing::debug!(resource = %name, token, "resource provides capability");
        }
        Arc::clone(&factory).register_provided(&self.get_instance_props.construct_container);
        self.resources.insert(name, factory);
        self
    }

    /// Resolve every resource in insertion order
    ///
    /// # Errors
    ///
    /// The first resource error; later resources are not resolved.
    pub fn synthesize(&self) -> Result<()> {
        for (name, resource) in &self.resources {
            tracing::debug!(resource = %name, "synthesizing resource");
            resource.synthesize(&self.get_instance_props)?;
        }
        tracing::info!(
            resources = self.resources.len(),
            entries = self.get_instance_props.construct_container.len(),
            "backend synthesized"
        );
        Ok(())
    }

    /// Props handed to factories
    #[inline]
    #[must_use]
    pub fn get_instance_props(&self) -> &ConstructFactoryGetInstanceProps {
        &self.get_instance_props
    }

    /// Shared container
    #[inline]
    #[must_use]
    pub fn construct_container(&self) -> &Arc<ConstructContainer> {
        &self.get_instance_props.construct_container
    }

    /// Output storage
    #[inline]
    #[must_use]
    pub fn output_storage(&self) -> &Arc<InMemoryBackendOutputStorage> {
        &self.output_storage
    }

    /// Resource names in insertion order
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }
}
