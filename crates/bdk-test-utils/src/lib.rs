//! Testing utilities for BDK workspace
//!
//! Shared stubs, fixtures, and tracing setup.

#![allow(missing_docs)]

use bdk_platform::{
    Backend, BackendError, ConstructContainerEntryGenerator, ConstructFactory,
    ConstructFactoryGetInstanceProps, DefinitionSite, FunctionResources, GenerateContainerEntryProps,
    GeneratorId, ImportPathVerifier, LambdaFunction, Policy, ResourceAccessAcceptor,
    ResourceAccessAcceptorFactory, ResourceNameValidator, ResourceProvider, Role,
    SsmEnvironmentEntry, Stack, StackProvider, SynthesisConfig,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

/// Install an env-filtered subscriber once per test binary (`RUST_LOG=debug`)
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Backend with default configuration
pub fn setup_test_backend() -> Backend {
    init_test_tracing();
    Backend::new(&SynthesisConfig::default())
}

/// Get-instance props backed by a fresh container and in-memory outputs
pub fn get_instance_props() -> ConstructFactoryGetInstanceProps {
    setup_test_backend().get_instance_props().clone()
}

/// Import path verifier that records every call and accepts everything
#[derive(Debug, Default)]
pub struct ImportPathVerifierStub {
    pub calls: Mutex<Vec<(DefinitionSite, String, String)>>,
}

impl ImportPathVerifier for ImportPathVerifierStub {
    fn verify(&self, site: &DefinitionSite, expected_path: &str, error_message: &str) -> bdk_platform::Result<()> {
        self.calls
            .lock()
            .push((site.clone(), expected_path.to_string(), error_message.to_string()));
        Ok(())
    }
}

/// Name validator that records names and optionally rejects them all
#[derive(Debug, Default)]
pub struct ResourceNameValidatorStub {
    pub reject: bool,
    pub validated: Mutex<Vec<String>>,
}

impl ResourceNameValidatorStub {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            validated: Mutex::default(),
        }
    }
}

impl ResourceNameValidator for ResourceNameValidatorStub {
    fn validate(&self, name: &str) -> bdk_platform::Result<()> {
        self.validated.lock().push(name.to_string());
        if self.reject {
            return Err(BackendError::InvalidResourceName {
                name: name.to_string(),
                reason: "rejected by stub".to_string(),
            });
        }
        Ok(())
    }
}

/// One accepted policy with the SSM entries handed along
#[derive(Debug, Clone)]
pub struct AcceptedAccess {
    pub policy: Arc<Policy>,
    pub ssm_environment_entries: Vec<SsmEnvironmentEntry>,
}

/// Acceptor attaching to a role and recording what it accepted
#[derive(Debug)]
pub struct RecordingAcceptor {
    identifier: String,
    role: Arc<Role>,
    pub accepted: Mutex<Vec<AcceptedAccess>>,
}

impl RecordingAcceptor {
    pub fn new(identifier: impl Into<String>, role: Arc<Role>) -> Self {
        Self {
            identifier: identifier.into(),
            role,
            accepted: Mutex::default(),
        }
    }

    pub fn accepted(&self) -> Vec<AcceptedAccess> {
        self.accepted.lock().clone()
    }
}

impl ResourceAccessAcceptor for RecordingAcceptor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn accept_resource_access(
        &self,
        policy: Arc<Policy>,
        ssm_environment_entries: &[SsmEnvironmentEntry],
    ) -> bdk_platform::Result<()> {
        self.role.attach_policy(Arc::clone(&policy));
        self.accepted.lock().push(AcceptedAccess {
            policy,
            ssm_environment_entries: ssm_environment_entries.to_vec(),
        });
        Ok(())
    }
}

/// Minimal function resource provider
#[derive(Debug)]
pub struct StubFunction {
    resources: FunctionResources,
    stack: Arc<Stack>,
    pub acceptor: Arc<RecordingAcceptor>,
}

impl StubFunction {
    pub fn lambda(&self) -> &Arc<LambdaFunction> {
        &self.resources.lambda
    }
}

impl ResourceProvider for StubFunction {
    type Resources = FunctionResources;

    fn resources(&self) -> &FunctionResources {
        &self.resources
    }
}

impl StackProvider for StubFunction {
    fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }
}

impl ResourceAccessAcceptorFactory for StubFunction {
    fn get_resource_access_acceptor(
        &self,
        role_identifier: Option<&str>,
    ) -> bdk_platform::Result<Arc<dyn ResourceAccessAcceptor>> {
        match role_identifier {
            None => Ok(self.acceptor.clone()),
            Some(other) => Err(BackendError::InvalidResourceAccessConfig {
                message: format!("No role found for \"{other}\"."),
                resolution: "Function resources have a single execution role.".to_string(),
            }),
        }
    }
}

/// Factory producing a [`StubFunction`]
#[derive(Debug)]
pub struct StubFunctionFactory {
    id: GeneratorId,
    name: String,
    generations: AtomicUsize,
}

impl StubFunctionFactory {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: GeneratorId::new(),
            name: name.into(),
            generations: AtomicUsize::new(0),
        })
    }

    /// How often the container ran this generator
    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

impl ConstructContainerEntryGenerator for StubFunctionFactory {
    type Entry = StubFunction;

    fn id(&self) -> GeneratorId {
        self.id
    }

    fn resource_group_name(&self) -> &str {
        "function"
    }

    fn generate_container_entry(&self, props: &GenerateContainerEntryProps<'_>) -> bdk_platform::Result<StubFunction> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        let role_name = format!("{}LambdaRole", self.name);
        let role = Arc::new(Role::new(
            role_name.clone(),
            props.scope.format_arn("iam", &format!("role/{role_name}")),
        ));
        let lambda = Arc::new(LambdaFunction::new(
            self.name.clone(),
            props.scope.format_arn("lambda", &format!("function:{}", self.name)),
            Arc::clone(&role),
        ));
        Ok(StubFunction {
            resources: FunctionResources { lambda },
            stack: Arc::clone(&props.scope),
            acceptor: Arc::new(RecordingAcceptor::new(
                format!("{}LambdaResourceAccessAcceptor", self.name),
                role,
            )),
        })
    }
}

impl ConstructFactory for StubFunctionFactory {
    type Output = StubFunction;

    fn get_instance(&self, props: &ConstructFactoryGetInstanceProps) -> bdk_platform::Result<Arc<StubFunction>> {
        props.construct_container.get_or_compute(self)
    }
}
