//! GraphQL API construct model
//!
//! [`DataConstruct`] stands in for the API infrastructure construct. It
//! takes resolved props, registers the API, its model tables, function data
//! sources and logging resources in the owning stack, and computes the
//! GraphQL backend output.

use crate::access::MODEL_INTROSPECTION_SCHEMA_KEY;
use crate::props::{AuthorizationModeKind, FieldLogLevel, OidcAuthorizationMode};
use crate::schema::model_names;
use bdk_platform::{
    BackendOutputEntry, ConstructError, LambdaFunction, LogRetention, Policy, PolicyStatement, Role, Stack, Tags,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// GraphQL API resource type
pub const GRAPHQL_API_TYPE: &str = "AWS::AppSync::GraphQLApi";
/// Table created for a model
pub const TABLE_TYPE: &str = "Custom::AmplifyDynamoDBTable";
/// Table adopted from a previous deployment
pub const IMPORTED_TABLE_TYPE: &str = "Custom::ImportedAmplifyDynamoDBTable";
/// Lambda data source resource type
pub const DATA_SOURCE_TYPE: &str = "AWS::AppSync::DataSource";

const MAX_API_KEY_EXPIRATION_DAYS: u32 = 365;

/// Authorization settings with referenced resources resolved
#[derive(Debug, Clone)]
pub struct ResolvedAuthorizationModes {
    /// Default mode
    pub default_mode: AuthorizationModeKind,
    /// Other enabled modes
    pub additional_modes: Vec<AuthorizationModeKind>,
    /// API key lifetime, when API key mode is enabled
    pub api_key_expiration_days: Option<u32>,
    /// User pool backing user pool mode
    pub user_pool_id: Option<String>,
    /// Identity pool roles allowed to call the API with IAM
    pub identity_pool_roles: Vec<Arc<Role>>,
    /// OIDC settings
    pub oidc: Option<OidcAuthorizationMode>,
    /// Lambda authorizer
    pub lambda_authorizer: Option<(Arc<LambdaFunction>, u32)>,
}

impl ResolvedAuthorizationModes {
    /// Whether `mode` is enabled, as default or additional mode
    #[must_use]
    pub fn is_enabled(&self, mode: AuthorizationModeKind) -> bool {
        self.default_mode == mode || self.additional_modes.contains(&mode)
    }
}

/// Logging settings with defaults applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDataLogging {
    /// Drop request and response bodies
    pub exclude_verbose_content: bool,
    /// Resolver field log level
    pub field_log_level: FieldLogLevel,
    /// Log group retention
    pub retention: LogRetention,
}

impl Default for ResolvedDataLogging {
    fn default() -> Self {
        Self {
            exclude_verbose_content: true,
            field_log_level: FieldLogLevel::None,
            retention: LogRetention::ONE_WEEK,
        }
    }
}

/// Construct input
#[derive(Debug, Clone)]
pub struct DataConstructProps {
    /// GraphQL schema
    pub schema: String,
    /// Authorization
    pub authorization_modes: ResolvedAuthorizationModes,
    /// Function data sources by schema function name
    pub functions: BTreeMap<String, Arc<LambdaFunction>>,
    /// Logging, when enabled
    pub logging: Option<ResolvedDataLogging>,
    /// Model name to existing table name
    pub imported_tables: BTreeMap<String, String>,
    /// Allow schema updates that drop tables or fields
    pub allow_destructive_graphql_schema_updates: bool,
    /// Replace tables instead of rolling out index updates
    pub replace_table_upon_gsi_update: bool,
    /// Suffix making physical ids unique
    pub physical_id_suffix: String,
}

/// Model table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    /// Physical table name
    pub table_name: String,
    /// Adopted from a previous deployment
    pub imported: bool,
}

/// Data resource handles
#[derive(Debug, Clone)]
pub struct DataResources {
    /// API id
    pub graphql_api_id: String,
    /// API ARN
    pub graphql_api_arn: String,
    /// GraphQL endpoint URL
    pub graphql_url: String,
    /// API key, when API key mode is enabled
    pub api_key: Option<String>,
    /// Bucket holding the model introspection schema
    pub model_introspection_schema_bucket_name: String,
    /// ARN of that bucket
    pub model_introspection_schema_bucket_arn: String,
    /// Tables by model name
    pub tables: BTreeMap<String, ModelTable>,
    /// Lambda data sources by function name
    pub function_data_sources: BTreeMap<String, Arc<LambdaFunction>>,
    /// Logging in effect
    pub logging: Option<ResolvedDataLogging>,
}

/// Instantiated data construct
#[derive(Debug)]
pub struct DataConstruct {
    id: String,
    resources: DataResources,
    tags: Tags,
    output: BackendOutputEntry,
}

impl DataConstruct {
    /// Validate props and create the API resources in `scope`
    ///
    /// # Errors
    ///
    /// [`ConstructError::InvalidProps`] if an imported model is not in the
    /// schema or the API key lifetime is out of range.
    /// [`ConstructError::DuplicateLogicalId`] if `scope` already holds a
    /// resource of this API.
    pub fn new(scope: &Stack, id: &str, props: DataConstructProps) -> Result<Self, ConstructError> {
        let models = model_names(&props.schema);
        if let Some(missing) = props.imported_tables.keys().find(|m| !models.contains(m)) {
            return Err(ConstructError::invalid(format!("Imported model not found in schema: {missing}")));
        }
        if let Some(days) = props.authorization_modes.api_key_expiration_days {
            if !(1..=MAX_API_KEY_EXPIRATION_DAYS).contains(&days) {
                return Err(ConstructError::invalid(format!(
                    "API key expiration must be between 1 and {MAX_API_KEY_EXPIRATION_DAYS} days, received {days}"
                )));
            }
        }

        let suffix: String = props.physical_id_suffix.chars().take(26).collect();
        let graphql_api_id = suffix.clone();
        let graphql_api_arn = scope.format_arn("appsync", &format!("apis/{graphql_api_id}"));
        let graphql_url = format!("https://{graphql_api_id}.appsync-api.{}.amazonaws.com/graphql", scope.region());
        scope.add_resource(format!("{id}GraphQLAPI"), GRAPHQL_API_TYPE)?;

        let api_key = match props.authorization_modes.api_key_expiration_days {
            Some(_) => {
                scope.add_resource(format!("{id}GraphQLAPIDefaultApiKey"), "AWS::AppSync::ApiKey")?;
                Some(format!("da2-{}", suffix.chars().take(12).collect::<String>()))
            }
            None => None,
        };

        let bucket_name = format!(
            "{}-modelintrospectionschemabucket-{}",
            id.to_lowercase(),
            suffix.chars().take(8).collect::<String>()
        );
        scope.add_resource(format!("{id}ModelIntrospectionSchemaBucket"), "AWS::S3::Bucket")?;

        let mut tables = BTreeMap::new();
        for model in &models {
            let table = match props.imported_tables.get(model) {
                Some(table_name) => {
                    scope.add_resource(format!("{model}Table"), IMPORTED_TABLE_TYPE)?;
                    ModelTable {
                        table_name: table_name.clone(),
                        imported: true,
                    }
                }
                None => {
                    scope.add_resource(format!("{model}Table"), TABLE_TYPE)?;
                    ModelTable {
                        table_name: format!("{model}-{graphql_api_id}-NONE"),
                        imported: false,
                    }
                }
            };
            tables.insert(model.clone(), table);
        }

        for name in props.functions.keys() {
            scope.add_resource(format!("{}LambdaDataSource", capitalize(name)), DATA_SOURCE_TYPE)?;
        }

        if props.authorization_modes.lambda_authorizer.is_some() {
            scope.add_resource(format!("{id}LambdaAuthorizerPermission"), "AWS::Lambda::Permission")?;
        }

        if props.logging.is_some() {
            scope.add_resource(format!("{id}LogRetention"), "Custom::LogRetention")?;
        }

        if props.authorization_modes.is_enabled(AuthorizationModeKind::Iam) {
            for role in &props.authorization_modes.identity_pool_roles {
                let policy = Policy::new(
                    format!("{}{id}GraphQLPolicy", role.name()),
                    vec![PolicyStatement::allow(["appsync:GraphQL"], [format!("{graphql_api_arn}/*")])],
                );
                role.attach_policy(Arc::new(policy));
            }
        }

        let resources = DataResources {
            graphql_api_arn,
            graphql_url,
            api_key,
            model_introspection_schema_bucket_arn: format!("arn:aws:s3:::{bucket_name}"),
            model_introspection_schema_bucket_name: bucket_name,
            tables,
            function_data_sources: props.functions.clone(),
            logging: props.logging,
            graphql_api_id,
        };
        let output = output_entry(scope, &resources, &props);
        tracing::debug!(
            api = %id,
            models = resources.tables.len(),
            data_sources = resources.function_data_sources.len(),
            "data construct created"
        );

        Ok(Self {
            id: id.to_string(),
            resources,
            tags: Tags::new(),
            output,
        })
    }

    /// Construct id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resource handles
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &DataResources {
        &self.resources
    }

    /// Construct tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// GraphQL backend output
    #[inline]
    #[must_use]
    pub fn output(&self) -> &BackendOutputEntry {
        &self.output
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn output_entry(scope: &Stack, resources: &DataResources, props: &DataConstructProps) -> BackendOutputEntry {
    let modes = &props.authorization_modes;
    let mut entry = BackendOutputEntry::new("1")
        .with_field("awsAppsyncApiId", resources.graphql_api_id.as_str())
        .with_field("awsAppsyncApiEndpoint", resources.graphql_url.as_str())
        .with_field("awsAppsyncAuthenticationType", modes.default_mode.authentication_type())
        .with_field("awsAppsyncRegion", scope.region())
        .with_field(
            "amplifyApiModelSchemaS3Uri",
            format!(
                "s3://{}/{MODEL_INTROSPECTION_SCHEMA_KEY}",
                resources.model_introspection_schema_bucket_name
            ),
        );
    if !modes.additional_modes.is_empty() {
        let additional: Vec<&str> = modes
            .additional_modes
            .iter()
            .map(|m| m.authentication_type())
            .collect();
        entry = entry.with_field("awsAppsyncAdditionalAuthenticationTypes", additional.join(","));
    }
    if let Some(key) = &resources.api_key {
        entry = entry.with_field("awsAppsyncApiKey", key.as_str());
    }
    entry
}
