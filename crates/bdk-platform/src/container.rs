//! Construct container
//!
//! Provides [`ConstructContainer`], the single piece of mutable shared state
//! in the synthesis path:
//! - entries are computed lazily, at most once per generator identity
//! - every later request observes the identical `Arc`
//! - entries only ever go from absent to present
//! - a generator that (transitively) requests its own entry fails with
//!   [`BackendError::CyclicDependency`]
//!
//! Resolution is synchronous and serialized across threads. Generators run
//! without the entry lock held so they can resolve the entries they depend
//! on; a thread requesting an entry another thread is computing waits and
//! then observes that thread's entry.

use crate::construct::{Stack, StackResolver};
use crate::error::{BackendError, Result};
use crate::identifiers::StableBackendIdentifiers;
use crate::secrets::BackendSecretResolver;
use crate::ssm::SsmEnvironmentEntriesGenerator;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use ulid::Ulid;

type Entry = Arc<dyn Any + Send + Sync>;

/// Identity of a container entry generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorId(pub Ulid);

impl GeneratorId {
    /// Generate new identity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for GeneratorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collaborators handed to a generator when its entry is computed
pub struct GenerateContainerEntryProps<'a> {
    /// Stack of the generator's resource group
    pub scope: Arc<Stack>,
    /// Secret reference resolver
    pub backend_secret_resolver: &'a dyn BackendSecretResolver,
    /// Parameter publisher for runtime environment entries
    pub ssm_environment_entries_generator: &'a SsmEnvironmentEntriesGenerator,
    /// Deterministic backend identifiers
    pub stable_backend_identifiers: &'a StableBackendIdentifiers,
}

/// Builds one container entry
pub trait ConstructContainerEntryGenerator: Send + Sync {
    /// Entry type
    type Entry: Send + Sync + 'static;

    /// Identity the entry is cached under
    fn id(&self) -> GeneratorId;

    /// Resource group whose stack the entry is built in
    fn resource_group_name(&self) -> &str;

    /// Build the entry
    ///
    /// # Errors
    ///
    /// Any error is terminal for this attempt and is returned to the caller
    /// of [`ConstructContainer::get_or_compute`].
    fn generate_container_entry(&self, props: &GenerateContainerEntryProps<'_>) -> Result<Self::Entry>;
}

/// Lazily computed singleton registry
pub struct ConstructContainer {
    entries: Mutex<HashMap<GeneratorId, Entry>>,
    resolution: ReentrantMutex<()>,
    resolving: Mutex<Vec<(GeneratorId, String)>>,
    factories: RwLock<HashMap<String, Entry>>,
    stack_resolver: StackResolver,
    backend_secret_resolver: Arc<dyn BackendSecretResolver>,
    ssm_environment_entries_generator: SsmEnvironmentEntriesGenerator,
    stable_backend_identifiers: StableBackendIdentifiers,
}

impl std::fmt::Debug for ConstructContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructContainer")
            .field("entries", &self.entries.lock().len())
            .field("stacks", &self.stack_resolver.len())
            .field("backend", self.stable_backend_identifiers.backend_identifier())
            .finish_non_exhaustive()
    }
}

impl ConstructContainer {
    /// Create container
    #[must_use]
    pub fn new(
        stack_resolver: StackResolver,
        backend_secret_resolver: Arc<dyn BackendSecretResolver>,
        ssm_environment_entries_generator: SsmEnvironmentEntriesGenerator,
        stable_backend_identifiers: StableBackendIdentifiers,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            resolution: ReentrantMutex::new(()),
            resolving: Mutex::new(Vec::new()),
            factories: RwLock::new(HashMap::new()),
            stack_resolver,
            backend_secret_resolver,
            ssm_environment_entries_generator,
            stable_backend_identifiers,
        }
    }

    /// Entry for `generator`, computed on first request
    ///
    /// # Errors
    ///
    /// - [`BackendError::CyclicDependency`] if the generator is already being resolved
    /// - any error returned by the generator
    pub fn get_or_compute<G>(&self, generator: &G) -> Result<Arc<G::Entry>>
    where
        G: ConstructContainerEntryGenerator + ?Sized,
    {
        let id = generator.id();
        let group = generator.resource_group_name();

        if let Some(entry) = self.cached(id) {
            return downcast_entry::<G::Entry>(entry, group);
        }

        let _resolution = self.resolution.lock();
        if let Some(entry) = self.cached(id) {
            return downcast_entry::<G::Entry>(entry, group);
        }

        let resolving = self.enter(id, group)?;
        tracing::debug!(generator = %id, resource_group = group, "computing container entry");

        let props = GenerateContainerEntryProps {
            scope: self.stack_resolver.get_stack_for(group),
            backend_secret_resolver: self.backend_secret_resolver.as_ref(),
            ssm_environment_entries_generator: &self.ssm_environment_entries_generator,
            stable_backend_identifiers: &self.stable_backend_identifiers,
        };
        let generated = generator.generate_container_entry(&props);
        drop(resolving);

        let entry: Entry = Arc::new(generated?);
        let stored = Arc::clone(self.entries.lock().entry(id).or_insert(entry));
        downcast_entry::<G::Entry>(stored, group)
    }

    /// Check if an entry was computed for `id`
    #[inline]
    #[must_use]
    pub fn contains(&self, id: GeneratorId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Number of computed entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no entry was computed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Register a factory under the token it provides
    pub fn register_construct_factory<T>(&self, token: &str, factory: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        tracing::debug!(token, "registering construct factory");
        self.factories
            .write()
            .insert(token.to_string(), Arc::new(factory));
    }

    /// Factory registered under `token`, if it has the requested type
    #[must_use]
    pub fn get_construct_factory<T>(&self, token: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = self.factories.read().get(token).cloned()?;
        entry
            .downcast::<Arc<T>>()
            .ok()
            .map(|factory| Arc::clone(&*factory))
    }

    /// Stack resolver
    #[inline]
    #[must_use]
    pub fn stack_resolver(&self) -> &StackResolver {
        &self.stack_resolver
    }

    /// Parameter publisher
    #[inline]
    #[must_use]
    pub fn ssm_environment_entries_generator(&self) -> &SsmEnvironmentEntriesGenerator {
        &self.ssm_environment_entries_generator
    }

    /// Deterministic backend identifiers
    #[inline]
    #[must_use]
    pub fn stable_backend_identifiers(&self) -> &StableBackendIdentifiers {
        &self.stable_backend_identifiers
    }

    fn cached(&self, id: GeneratorId) -> Option<Entry> {
        self.entries.lock().get(&id).cloned()
    }

    fn enter(&self, id: GeneratorId, group: &str) -> Result<Resolving<'_>> {
        let mut resolving = self.resolving.lock();
        if let Some(start) = resolving.iter().position(|(r, _)| *r == id) {
            let mut path: Vec<String> = resolving[start..].iter().map(|(_, g)| g.clone()).collect();
            path.push(group.to_string());
            tracing::warn!(path = ?path, "cyclic construct resolution");
            return Err(BackendError::CyclicDependency { path });
        }
        resolving.push((id, group.to_string()));
        Ok(Resolving { container: self, id })
    }
}

/// Marks a generator as being resolved until dropped
struct Resolving<'a> {
    container: &'a ConstructContainer,
    id: GeneratorId,
}

impl Drop for Resolving<'_> {
    fn drop(&mut self) {
        self.container.resolving.lock().retain(|(r, _)| *r != self.id);
    }
}

fn downcast_entry<T: Send + Sync + 'static>(entry: Entry, group: &str) -> Result<Arc<T>> {
    entry
        .downcast::<T>()
        .map_err(|_| BackendError::EntryTypeMismatch(group.to_string()))
}
