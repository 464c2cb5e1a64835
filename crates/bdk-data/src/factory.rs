//! `define_data` and the data resource provider

use crate::access::{DataAction, GraphqlAccessPolicyFactory, MODEL_INTROSPECTION_SCHEMA_KEY};
use crate::construct::{DataConstruct, DataResources};
use crate::props::DataProps;
use crate::translate::translate_data_props;
use bdk_platform::{
    resource_group, AccessBuilder, AccessPolicyArbiter, BackendError, BuildSession, ConstructContainerEntryGenerator,
    ConstructFactory, ConstructFactoryGetInstanceProps, DefinitionSite, GenerateContainerEntryProps, GeneratorId,
    ResourceProvider, Result, SingletonKind, Stack, StackProvider, GRAPHQL_OUTPUT_KEY,
};
use std::sync::Arc;

/// Name used when the props do not set one
pub const DEFAULT_DATA_NAME: &str = "amplifyData";

/// Data is defined at most once per backend
pub const DATA_SINGLETON: SingletonKind = SingletonKind {
    name: "data",
    message: "Multiple `defineData` calls are not allowed within an Amplify backend",
    resolution: "Remove all but one `defineData` call",
};

const EXPECTED_IMPORT_PATH: &str = "amplify/data/resource";
const IMPORT_PATH_ERROR: &str = "Amplify Data must be defined in amplify/data/resource.rs";

/// Define the GraphQL API of a backend
///
/// # Errors
///
/// [`BackendError::MultipleSingletonResources`] if data was already defined
/// in this session.
#[track_caller]
pub fn define_data(session: &BuildSession, props: DataProps) -> Result<Arc<DataFactory>> {
    let definition_site = DefinitionSite::caller();
    session.register_singleton(&DATA_SINGLETON)?;
    tracing::debug!(site = %definition_site, "data defined");
    Ok(Arc::new(DataFactory {
        props,
        definition_site,
        generator_id: GeneratorId::new(),
    }))
}

/// Factory returned by [`define_data`]
#[derive(Debug)]
pub struct DataFactory {
    props: DataProps,
    definition_site: DefinitionSite,
    generator_id: GeneratorId,
}

impl DataFactory {
    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        self.props.name.as_deref().unwrap_or(DEFAULT_DATA_NAME)
    }
}

impl ConstructFactory for DataFactory {
    type Output = BackendData;

    fn get_instance(&self, props: &ConstructFactoryGetInstanceProps) -> Result<Arc<BackendData>> {
        if let Some(verifier) = &props.import_path_verifier {
            verifier.verify(&self.definition_site, EXPECTED_IMPORT_PATH, IMPORT_PATH_ERROR)?;
        }
        if let (Some(validator), Some(name)) = (&props.resource_name_validator, &self.props.name) {
            validator.validate(name)?;
        }
        props.construct_container.get_or_compute(&DataGenerator {
            id: self.generator_id,
            name: self.name(),
            props: &self.props,
            get_instance_props: props,
        })
    }
}

struct DataGenerator<'a> {
    id: GeneratorId,
    name: &'a str,
    props: &'a DataProps,
    get_instance_props: &'a ConstructFactoryGetInstanceProps,
}

impl ConstructContainerEntryGenerator for DataGenerator<'_> {
    type Entry = BackendData;

    fn id(&self) -> GeneratorId {
        self.id
    }

    fn resource_group_name(&self) -> &str {
        resource_group::DATA
    }

    fn generate_container_entry(&self, generate_props: &GenerateContainerEntryProps<'_>) -> Result<BackendData> {
        let construct_props = translate_data_props(self.name, self.props, generate_props, self.get_instance_props)?;
        let construct = DataConstruct::new(&generate_props.scope, self.name, construct_props)
            .map_err(|source| BackendError::construct_initialization("Data", source))?;
        construct.tags().set_friendly_name(self.name);

        self.get_instance_props
            .output_storage_strategy
            .add_backend_output_entry(GRAPHQL_OUTPUT_KEY, construct.output().clone());

        let backend_data = BackendData {
            construct,
            stack: Arc::clone(&generate_props.scope),
        };

        if let Some(access) = &self.props.access {
            let resources = backend_data.resources();
            let endpoint_key = format!("{}_GRAPHQL_ENDPOINT", self.name);
            let bucket_key = format!("{}_MODEL_INTROSPECTION_SCHEMA_BUCKET_NAME", self.name);
            let schema_key = format!("{}_MODEL_INTROSPECTION_SCHEMA_KEY", self.name);
            let ssm_entries = generate_props.ssm_environment_entries_generator.generate_ssm_environment_entries([
                (endpoint_key.as_str(), resources.graphql_url.as_str()),
                (bucket_key.as_str(), resources.model_introspection_schema_bucket_name.as_str()),
                (schema_key.as_str(), MODEL_INTROSPECTION_SCHEMA_KEY),
            ]);
            let grants = access(&AccessBuilder::<DataAction>::new());
            let policy_factory = GraphqlAccessPolicyFactory::new(
                resources.graphql_api_arn.as_str(),
                resources.model_introspection_schema_bucket_arn.as_str(),
            );
            AccessPolicyArbiter::new(self.name, grants, self.get_instance_props, ssm_entries, &policy_factory)
                .arbitrate_policies()?;
        }

        Ok(backend_data)
    }
}

/// Data resource provider
#[derive(Debug)]
pub struct BackendData {
    construct: DataConstruct,
    stack: Arc<Stack>,
}

impl BackendData {
    /// Underlying construct
    #[inline]
    #[must_use]
    pub fn construct(&self) -> &DataConstruct {
        &self.construct
    }
}

impl ResourceProvider for BackendData {
    type Resources = DataResources;

    fn resources(&self) -> &DataResources {
        self.construct.resources()
    }
}

impl StackProvider for BackendData {
    fn stack(&self) -> &Arc<Stack> {
        &self.stack
    }
}
