//! `define_function` and the function resource provider

use crate::props::{EnvironmentValue, FunctionProps};
use crate::resolve::{resolve_function_props, ResolvedFunctionProps};
use bdk_platform::{
    resource_group, BackendOutputEntry, BuildSession, ConstructContainerEntryGenerator, ConstructFactory,
    ConstructFactoryGetInstanceProps, DefinitionSite, FunctionResources, GenerateContainerEntryProps, GeneratorId,
    LambdaFunction, Policy, ResourceAccessAcceptor, ResourceAccessAcceptorFactory, ResourceProvider, Result, Role,
    SsmEnvironmentEntry, Stack, StackProvider, BackendError, ConstructError, FUNCTION_OUTPUT_KEY,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Environment variable listing parameter-store backed variables
pub const SSM_ENV_CONFIG_KEY: &str = "AMPLIFY_SSM_ENV_CONFIG";
/// Value of variables filled from the parameter store at runtime
pub const RUNTIME_RESOLVED_PLACEHOLDER: &str = "<value will be resolved during runtime>";
/// Output field listing every defined function
pub const DEFINED_FUNCTIONS_FIELD: &str = "definedFunctions";

/// Lambda resource type
pub const LAMBDA_FUNCTION_TYPE: &str = "AWS::Lambda::Function";

/// Define a function
///
/// Any number of functions may be defined; each factory still resolves to
/// one instance. Props are validated when the instance is first requested.
#[track_caller]
pub fn define_function(session: &BuildSession, props: FunctionProps) -> Arc<FunctionFactory> {
    let definition_site = DefinitionSite::caller();
    let earlier = session.register_definition("function");
    tracing::debug!(site = %definition_site, earlier, "function defined");
    Arc::new(FunctionFactory {
        props,
        definition_site,
        generator_id: GeneratorId::new(),
    })
}

/// Factory returned by [`define_function`]
#[derive(Debug)]
pub struct FunctionFactory {
    props: FunctionProps,
    definition_site: DefinitionSite,
    generator_id: GeneratorId,
}

impl FunctionFactory {
    /// Where `define_function` was called
    #[inline]
    #[must_use]
    pub fn definition_site(&self) -> &DefinitionSite {
        &self.definition_site
    }
}

impl ConstructFactory for FunctionFactory {
    type Output = BackendFunction;

    fn get_instance(&self, props: &ConstructFactoryGetInstanceProps) -> Result<Arc<BackendFunction>> {
        let resolved = resolve_function_props(&self.props, &self.definition_site)?;
        if let Some(validator) = &props.resource_name_validator {
            validator.validate(&resolved.name)?;
        }
        let generator = FunctionGenerator {
            id: self.generator_id,
            resolved,
            get_instance_props: props,
        };
        props.construct_container.get_or_compute(&generator)
    }
}

struct FunctionGenerator<'a> {
    id: GeneratorId,
    resolved: ResolvedFunctionProps,
    get_instance_props: &'a ConstructFactoryGetInstanceProps,
}

impl ConstructContainerEntryGenerator for FunctionGenerator<'_> {
    type Entry = BackendFunction;

    fn id(&self) -> GeneratorId {
        self.id
    }

    fn resource_group_name(&self) -> &str {
        resource_group::FUNCTION
    }

    fn generate_container_entry(&self, generate_props: &GenerateContainerEntryProps<'_>) -> Result<BackendFunction> {
        let name = &self.resolved.name;
        let lambda = add_lambda_resources(&generate_props.scope, &self.resolved)
            .map_err(|source| BackendError::construct_initialization("Function", source))?;
        lambda.tags().set_friendly_name(name);

        let acceptor = Arc::new(FunctionAccessAcceptor {
            identifier: format!("{name}LambdaResourceAccessAcceptor"),
            lambda: Arc::clone(&lambda),
            ssm_environment: Mutex::default(),
        });

        let mut secret_entries = Vec::new();
        for (key, value) in &self.resolved.environment {
            match value {
                EnvironmentValue::Plain(value) => lambda.add_environment(key.clone(), value.clone()),
                EnvironmentValue::Secret(secret) => {
                    let resolved = generate_props.backend_secret_resolver.resolve_secret(secret);
                    secret_entries.push(SsmEnvironmentEntry {
                        name: key.clone(),
                        path: resolved.parameter_path().to_string(),
                    });
                }
            }
        }
        acceptor.add_ssm_environment_entries(&secret_entries);

        self.get_instance_props.output_storage_strategy.append_to_backend_output_list(
            FUNCTION_OUTPUT_KEY,
            BackendOutputEntry::new("1").with_field(DEFINED_FUNCTIONS_FIELD, name.clone()),
        );
        tracing::debug!(function = %name, "function generated");

        Ok(BackendFunction {
            resources: FunctionResources { lambda },
            stack: Arc::clone(&generate_props.scope),
            props: self.resolved.clone(),
            acceptor,
        })
    }
}

fn add_lambda_resources(scope: &Stack, resolved: &ResolvedFunctionProps) -> Result<Arc<LambdaFunction>, ConstructError> {
    let name = &resolved.name;

    let role_name = format!("{name}lambdaServiceRole");
    scope.add_resource(role_name.clone(), "AWS::IAM::Role")?;
    let role_arn = scope.format_arn("iam", &format!("role/{role_name}"));
    let role = Arc::new(Role::new(role_name, role_arn));

    scope.add_resource(format!("{name}lambda"), LAMBDA_FUNCTION_TYPE)?;
    for index in 0..resolved.schedule_expressions.len() {
        scope.add_resource(format!("{name}schedule{index}"), "AWS::Events::Rule")?;
    }
    if resolved.logging.retention.is_some() {
        scope.add_resource(format!("{name}LogRetention"), "Custom::LogRetention")?;
    }

    Ok(Arc::new(LambdaFunction::new(
        name.clone(),
        scope.format_arn("lambda", &format!("function:{name}")),
        role,
    )))
}

/// Function resource provider
#[derive(Debug)]
pub struct BackendFunction {
    resources: FunctionResources,
    stack: Arc<Stack>,
    props: ResolvedFunctionProps,
    acceptor: Arc<FunctionAccessAcceptor>,
}

impl BackendFunction {
    /// Props the function was built with
    #[inline]
    #[must_use]
    pub fn props(&self) -> &ResolvedFunctionProps {
        &self.props
    }

    /// Add an environment variable after definition
    pub fn add_environment(&self, key: impl Into<String>, value: impl Into<String>) {
        self.resources.lambda.add_environment(key, value);
    }
}

impl ResourceProvider for BackendFunction {
    type Resources = FunctionResources;

    fn resources(&self) -> &FunctionResources {
        &self.resources
    }
}

impl StackProvider for BackendFunction {
    fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }
}

impl ResourceAccessAcceptorFactory for BackendFunction {
    fn get_resource_access_acceptor(&self, role_identifier: Option<&str>) -> Result<Arc<dyn ResourceAccessAcceptor>> {
        match role_identifier {
            None => Ok(self.acceptor.clone()),
            Some(other) => Err(BackendError::InvalidResourceAccessConfig {
                message: format!("No role found for \"{other}\" on function {}.", self.props.name),
                resolution: "Functions have a single execution role; grant access without a role identifier.".to_string(),
            }),
        }
    }
}

/// Attaches policies to the execution role and exposes parameters as environment
#[derive(Debug)]
struct FunctionAccessAcceptor {
    identifier: String,
    lambda: Arc<LambdaFunction>,
    ssm_environment: Mutex<BTreeMap<String, String>>,
}

impl FunctionAccessAcceptor {
    fn add_ssm_environment_entries(&self, entries: &[SsmEnvironmentEntry]) {
        if entries.is_empty() {
            return;
        }
        let mut ssm_environment = self.ssm_environment.lock();
        for entry in entries {
            ssm_environment.insert(entry.name.clone(), entry.path.clone());
            self.lambda.add_environment(entry.name.clone(), RUNTIME_RESOLVED_PLACEHOLDER);
        }
        let config: serde_json::Map<String, serde_json::Value> = ssm_environment
            .iter()
            .map(|(name, path)| (name.clone(), serde_json::json!({ "path": path })))
            .collect();
        self.lambda
            .add_environment(SSM_ENV_CONFIG_KEY, serde_json::Value::Object(config).to_string());
    }
}

impl ResourceAccessAcceptor for FunctionAccessAcceptor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn accept_resource_access(&self, policy: Arc<Policy>, ssm_environment_entries: &[SsmEnvironmentEntry]) -> Result<()> {
        self.lambda.role().attach_policy(policy);
        self.add_ssm_environment_entries(ssm_environment_entries);
        Ok(())
    }
}
