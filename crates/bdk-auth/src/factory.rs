//! `define_auth` and the auth resource provider
//!
//! The factory returned by [`define_auth`] resolves to one [`BackendAuth`]
//! per backend. Generating it translates props, instantiates the
//! [`AuthConstruct`], wires lifecycle triggers, stores the auth output and
//! arbitrates the access grants declared in the props.

use crate::access::{AuthAction, UserPoolAccessPolicyFactory};
use crate::construct::AuthConstruct;
use crate::props::AuthProps;
use crate::translate::translate_auth_props;
use bdk_platform::{
    resource_group, AccessBuilder, AccessPolicyArbiter, AuthResources, AuthResourcesProvider, BackendError,
    BuildSession, ConstructContainer, ConstructContainerEntryGenerator, ConstructFactory,
    ConstructFactoryGetInstanceProps, DefinitionSite, GenerateContainerEntryProps, GeneratorId, Policy,
    ResourceAccessAcceptor, ResourceAccessAcceptorFactory, ResourceProvider, Result, Role, SingletonKind,
    SsmEnvironmentEntry, Stack, StackProvider, AUTH_OUTPUT_KEY, AUTH_RESOURCES_TOKEN,
};
use std::sync::Arc;

/// Name used when the props do not set one
pub const DEFAULT_AUTH_NAME: &str = "amplifyAuth";

/// Auth is defined at most once per backend
pub const AUTH_SINGLETON: SingletonKind = SingletonKind {
    name: "auth",
    message: "Multiple `defineAuth` or `referenceAuth` calls are not allowed within an Amplify backend",
    resolution: "Remove all but one `defineAuth` or `referenceAuth` call",
};

const EXPECTED_IMPORT_PATH: &str = "amplify/auth/resource";
const IMPORT_PATH_ERROR: &str = "Amplify Auth must be defined in amplify/auth/resource.rs";

/// Define the auth resource of a backend
///
/// # Errors
///
/// [`BackendError::MultipleSingletonResources`] if auth was already defined
/// in this session.
#[track_caller]
pub fn define_auth(session: &BuildSession, props: AuthProps) -> Result<Arc<AuthFactory>> {
    let definition_site = DefinitionSite::caller();
    session.register_singleton(&AUTH_SINGLETON)?;
    tracing::debug!(site = %definition_site, "auth defined");
    Ok(Arc::new(AuthFactory {
        props,
        definition_site,
        generator_id: GeneratorId::new(),
    }))
}

/// Factory returned by [`define_auth`]
#[derive(Debug)]
pub struct AuthFactory {
    props: AuthProps,
    definition_site: DefinitionSite,
    generator_id: GeneratorId,
}

impl AuthFactory {
    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        self.props.name.as_deref().unwrap_or(DEFAULT_AUTH_NAME)
    }

    /// Where `define_auth` was called
    #[inline]
    #[must_use]
    pub fn definition_site(&self) -> &DefinitionSite {
        &self.definition_site
    }
}

impl ConstructFactory for AuthFactory {
    type Output = BackendAuth;

    fn provides(&self) -> Option<&'static str> {
        Some(AUTH_RESOURCES_TOKEN)
    }

    fn get_instance(&self, props: &ConstructFactoryGetInstanceProps) -> Result<Arc<BackendAuth>> {
        if let Some(verifier) = &props.import_path_verifier {
            verifier.verify(&self.definition_site, EXPECTED_IMPORT_PATH, IMPORT_PATH_ERROR)?;
        }
        if let (Some(validator), Some(name)) = (&props.resource_name_validator, &self.props.name) {
            validator.validate(name)?;
        }
        let generator = AuthGenerator {
            id: self.generator_id,
            name: self.name(),
            props: &self.props,
            get_instance_props: props,
        };
        props.construct_container.get_or_compute(&generator)
    }

    fn register_provided(self: Arc<Self>, container: &ConstructContainer) {
        let provider: Arc<dyn AuthResourcesProvider> = self;
        container.register_construct_factory(AUTH_RESOURCES_TOKEN, provider);
    }
}

struct AuthGenerator<'a> {
    id: GeneratorId,
    name: &'a str,
    props: &'a AuthProps,
    get_instance_props: &'a ConstructFactoryGetInstanceProps,
}

impl ConstructContainerEntryGenerator for AuthGenerator<'_> {
    type Entry = BackendAuth;

    fn id(&self) -> GeneratorId {
        self.id
    }

    fn resource_group_name(&self) -> &str {
        resource_group::AUTH
    }

    fn generate_container_entry(&self, generate_props: &GenerateContainerEntryProps<'_>) -> Result<BackendAuth> {
        let construct_props = translate_auth_props(self.name, self.props, generate_props, self.get_instance_props)?;
        let mut triggers = Vec::with_capacity(self.props.triggers.len());
        for (event, handler) in &self.props.triggers {
            triggers.push((event, handler.resolve_function_resources(self.get_instance_props)?));
        }

        let construct = AuthConstruct::new(&generate_props.scope, self.name, construct_props)
            .map_err(|source| BackendError::construct_initialization("Auth", source))?;
        construct.tags().set_friendly_name(self.name);

        let user_pool = &construct.resources().user_pool;
        for (event, function) in triggers {
            user_pool
                .add_trigger(event.as_str(), function.lambda)
                .map_err(|source| BackendError::construct_initialization("Auth", source))?;
            tracing::debug!(event = event.as_str(), "attached auth trigger");
        }

        self.get_instance_props
            .output_storage_strategy
            .add_backend_output_entry(AUTH_OUTPUT_KEY, construct.output().clone());

        let backend_auth = BackendAuth {
            construct,
            stack: Arc::clone(&generate_props.scope),
        };

        if let Some(access) = &self.props.access {
            let key = format!("{}_USERPOOL_ID", self.name);
            let resources = backend_auth.resources();
            let ssm_entries = generate_props
                .ssm_environment_entries_generator
                .generate_ssm_environment_entries([(key.as_str(), resources.user_pool.user_pool_id())]);
            let grants = access(&AccessBuilder::<AuthAction>::new());
            let policy_factory = UserPoolAccessPolicyFactory::new(resources.user_pool.user_pool_arn());
            AccessPolicyArbiter::new(self.name, grants, self.get_instance_props, ssm_entries, &policy_factory)
                .arbitrate_policies()?;
        }

        Ok(backend_auth)
    }
}

/// Auth resource provider
#[derive(Debug)]
pub struct BackendAuth {
    construct: AuthConstruct,
    stack: Arc<Stack>,
}

impl BackendAuth {
    /// Underlying construct
    #[inline]
    #[must_use]
    pub fn construct(&self) -> &AuthConstruct {
        &self.construct
    }
}

impl ResourceProvider for BackendAuth {
    type Resources = AuthResources;

    fn resources(&self) -> &AuthResources {
        self.construct.resources()
    }
}

impl StackProvider for BackendAuth {
    fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }
}

impl ResourceAccessAcceptorFactory for BackendAuth {
    fn get_resource_access_acceptor(&self, role_identifier: Option<&str>) -> Result<Arc<dyn ResourceAccessAcceptor>> {
        let resources = self.resources();
        let role = match role_identifier {
            Some("authenticatedUserIamRole") => Some(&resources.authenticated_user_iam_role),
            Some("unauthenticatedUserIamRole") => Some(&resources.unauthenticated_user_iam_role),
            Some(group) => resources.groups.get(group).map(|g| &g.role),
            None => None,
        };
        let (Some(identifier), Some(role)) = (role_identifier, role) else {
            return Err(BackendError::InvalidResourceAccessConfig {
                message: format!("No auth IAM role found for \"{}\".", role_identifier.unwrap_or_default()),
                resolution: "If you are trying to configure UserPool group access, ensure that the group name is specified correctly.".to_string(),
            });
        };
        Ok(Arc::new(RoleAccessAcceptor {
            identifier: format!("{identifier}ResourceAccessAcceptor"),
            role: Arc::clone(role),
        }))
    }
}

/// Attaches accepted policies to an auth role
#[derive(Debug)]
struct RoleAccessAcceptor {
    identifier: String,
    role: Arc<Role>,
}

impl ResourceAccessAcceptor for RoleAccessAcceptor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn accept_resource_access(&self, policy: Arc<Policy>, _ssm_environment_entries: &[SsmEnvironmentEntry]) -> Result<()> {
        if self.role.attach_policy(policy) {
            tracing::debug!(role = self.role.name(), "attached policy to auth role");
        }
        Ok(())
    }
}
