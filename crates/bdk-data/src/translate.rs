//! Translation of user props into construct props
//!
//! Authorization modes are settled against the auth resource registered in
//! the container, schema functions become deployed function handles and the
//! table mapping of the current deployment is selected.

use crate::construct::{DataConstructProps, ResolvedAuthorizationModes, ResolvedDataLogging};
use crate::props::{AuthorizationModeKind, AuthorizationModes, DataLogging, DataProps, TableMapping};
use crate::schema::function_references;
use bdk_platform::{
    AuthResources, AuthResourcesProvider, BackendError, BackendIdentifier, ConstructFactoryGetInstanceProps,
    DeploymentType, GenerateContainerEntryProps, Result, AUTH_RESOURCES_TOKEN,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Error code of data configuration failures
pub const DATA_CONFIGURATION_ERROR: &str = "DefineDataConfigurationError";

const SANDBOX_BRANCH_NAME: &str = "sandbox";

/// Build construct props for the data resource `name`
///
/// # Errors
///
/// [`BackendError::Configuration`] for inconsistent authorization modes,
/// table mappings or schema functions missing from the props, and errors
/// from resolving auth or functions.
pub fn translate_data_props(
    name: &str,
    props: &DataProps,
    generate_props: &GenerateContainerEntryProps<'_>,
    get_instance_props: &ConstructFactoryGetInstanceProps,
) -> Result<DataConstructProps> {
    let auth = get_instance_props
        .construct_container
        .get_construct_factory::<dyn AuthResourcesProvider>(AUTH_RESOURCES_TOKEN)
        .map(|provider| provider.resolve_auth_resources(get_instance_props))
        .transpose()?;

    let default_modes = AuthorizationModes::default();
    let modes = props.authorization_modes.as_ref().unwrap_or(&default_modes);
    let authorization_modes = resolve_authorization_modes(modes, auth.as_ref(), get_instance_props)?;

    if let Some(missing) = function_references(&props.schema)
        .into_iter()
        .find(|name| !props.functions.contains_key(name))
    {
        return Err(BackendError::configuration(
            DATA_CONFIGURATION_ERROR,
            format!("Function `{missing}` is referenced in the schema but was not provided to defineData"),
            format!("Add `{missing}` to the functions passed to 'defineData'"),
        ));
    }

    let mut functions = BTreeMap::new();
    for (function_name, factory) in &props.functions {
        let resources = factory.resolve_function_resources(get_instance_props)?;
        functions.insert(function_name.clone(), resources.lambda);
    }

    let identifiers = generate_props.stable_backend_identifiers;
    let backend_identifier = identifiers.backend_identifier();
    let imported_tables = select_table_mapping(&props.migrated_table_mappings, backend_identifier)?;
    let sandbox = backend_identifier.deployment_type == DeploymentType::Sandbox;

    Ok(DataConstructProps {
        schema: props.schema.clone(),
        authorization_modes,
        functions,
        logging: props.logging.map(resolve_logging),
        imported_tables,
        allow_destructive_graphql_schema_updates: true,
        replace_table_upon_gsi_update: sandbox,
        physical_id_suffix: identifiers.resource_id(name),
    })
}

fn resolve_authorization_modes(
    modes: &AuthorizationModes,
    auth: Option<&AuthResources>,
    get_instance_props: &ConstructFactoryGetInstanceProps,
) -> Result<ResolvedAuthorizationModes> {
    let configured = modes.configured();
    let default_mode = match (modes.default_authorization_mode, configured.as_slice()) {
        (Some(mode), _) => mode,
        (None, []) if auth.is_some() => AuthorizationModeKind::UserPool,
        (None, []) => AuthorizationModeKind::Iam,
        (None, [single]) => *single,
        (None, _) => {
            return Err(BackendError::configuration(
                DATA_CONFIGURATION_ERROR,
                "A defaultAuthorizationMode is required if multiple authorization modes are configured",
                "When calling 'defineData' specify 'authorizationModes.defaultAuthorizationMode'",
            ));
        }
    };

    match default_mode {
        AuthorizationModeKind::UserPool if auth.is_none() => {
            return Err(BackendError::configuration(
                DATA_CONFIGURATION_ERROR,
                "The userPool authorization mode requires auth to be defined",
                "Call 'defineAuth' in the same backend or choose another defaultAuthorizationMode",
            ));
        }
        AuthorizationModeKind::Oidc if modes.oidc.is_none() => {
            return Err(BackendError::configuration(
                DATA_CONFIGURATION_ERROR,
                "The oidc authorization mode is the default but no OIDC settings were provided",
                "Specify 'authorizationModes.oidcAuthorizationMode'",
            ));
        }
        AuthorizationModeKind::Lambda if modes.lambda.is_none() => {
            return Err(BackendError::configuration(
                DATA_CONFIGURATION_ERROR,
                "The lambda authorization mode is the default but no authorizer function was provided",
                "Specify 'authorizationModes.lambdaAuthorizationMode'",
            ));
        }
        _ => {}
    }

    let mut enabled: BTreeSet<AuthorizationModeKind> = configured.into_iter().collect();
    enabled.insert(AuthorizationModeKind::Iam);
    if auth.is_some() {
        enabled.insert(AuthorizationModeKind::UserPool);
    }
    if default_mode == AuthorizationModeKind::ApiKey {
        enabled.insert(AuthorizationModeKind::ApiKey);
    }
    enabled.remove(&default_mode);

    let api_key_enabled = default_mode == AuthorizationModeKind::ApiKey || enabled.contains(&AuthorizationModeKind::ApiKey);
    let lambda_authorizer = modes
        .lambda
        .as_ref()
        .map(|lambda| -> Result<_> {
            let resources = lambda.function.resolve_function_resources(get_instance_props)?;
            Ok((resources.lambda, lambda.time_to_live_in_seconds))
        })
        .transpose()?;

    Ok(ResolvedAuthorizationModes {
        default_mode,
        additional_modes: enabled.into_iter().collect(),
        api_key_expiration_days: api_key_enabled
            .then(|| modes.api_key.clone().unwrap_or_default().expires_in_days),
        user_pool_id: auth.map(|a| a.user_pool.user_pool_id().to_string()),
        identity_pool_roles: auth
            .map(|a| {
                vec![
                    Arc::clone(&a.authenticated_user_iam_role),
                    Arc::clone(&a.unauthenticated_user_iam_role),
                ]
            })
            .unwrap_or_default(),
        oidc: modes.oidc.clone(),
        lambda_authorizer,
    })
}

/// Apply logging defaults
#[must_use]
pub fn resolve_logging(logging: DataLogging) -> ResolvedDataLogging {
    let defaults = ResolvedDataLogging::default();
    ResolvedDataLogging {
        exclude_verbose_content: logging.exclude_verbose_content.unwrap_or(defaults.exclude_verbose_content),
        field_log_level: logging.field_log_level.unwrap_or(defaults.field_log_level),
        retention: logging.retention.unwrap_or(defaults.retention),
    }
}

/// Tables to import for the current deployment
///
/// Sandboxes select the `sandbox` mapping, branches the mapping named after
/// the branch.
///
/// # Errors
///
/// [`BackendError::Configuration`] if a branch name appears twice.
pub fn select_table_mapping(
    mappings: &[TableMapping],
    backend_identifier: &BackendIdentifier,
) -> Result<BTreeMap<String, String>> {
    let mut seen = BTreeSet::new();
    if mappings.iter().any(|m| !seen.insert(m.branch_name.as_str())) {
        return Err(BackendError::configuration(
            DATA_CONFIGURATION_ERROR,
            "Branch names must be unique in the migratedAmplifyGen1DynamoDbTableMappings",
            "Ensure that each branch name appears only once in 'migratedAmplifyGen1DynamoDbTableMappings'",
        ));
    }

    let branch = match backend_identifier.deployment_type {
        DeploymentType::Sandbox => SANDBOX_BRANCH_NAME,
        DeploymentType::Branch => backend_identifier.name.as_str(),
    };
    Ok(mappings
        .iter()
        .find(|m| m.branch_name == branch)
        .and_then(|m| m.model_name_to_table_name_mapping.clone())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{ApiKeyAuthorizationMode, FieldLogLevel, OidcAuthorizationMode};
    use bdk_platform::LogRetention;
    use bdk_test_utils::get_instance_props;
    use pretty_assertions::assert_eq;

    fn mapping(branch: &str, model: &str, table: &str) -> TableMapping {
        TableMapping {
            branch_name: branch.to_string(),
            model_name_to_table_name_mapping: Some(BTreeMap::from([(model.to_string(), table.to_string())])),
        }
    }

    fn oidc() -> OidcAuthorizationMode {
        OidcAuthorizationMode {
            oidc_provider_name: "provider".into(),
            oidc_issuer_url: "https://issuer.example.com".into(),
            client_id: None,
            token_expire_from_issue_in_seconds: 300,
            token_expiry_from_auth_in_seconds: 300,
        }
    }

    #[test]
    fn multiple_modes_need_a_default() {
        let modes = AuthorizationModes {
            api_key: Some(ApiKeyAuthorizationMode::default()),
            oidc: Some(oidc()),
            ..AuthorizationModes::default()
        };
        let err = resolve_authorization_modes(&modes, None, &get_instance_props()).unwrap_err();
        assert_eq!(err.code(), DATA_CONFIGURATION_ERROR);
        assert_eq!(
            err.to_string(),
            "A defaultAuthorizationMode is required if multiple authorization modes are configured"
        );
        assert_eq!(
            err.resolution(),
            Some("When calling 'defineData' specify 'authorizationModes.defaultAuthorizationMode'")
        );
    }

    #[test]
    fn default_is_iam_without_auth() {
        let resolved =
            resolve_authorization_modes(&AuthorizationModes::default(), None, &get_instance_props()).unwrap();
        assert_eq!(resolved.default_mode, AuthorizationModeKind::Iam);
        assert!(resolved.additional_modes.is_empty());
        assert_eq!(resolved.api_key_expiration_days, None);
    }

    #[test]
    fn single_configured_mode_becomes_default() {
        let modes = AuthorizationModes {
            api_key: Some(ApiKeyAuthorizationMode {
                expires_in_days: 30,
                description: None,
            }),
            ..AuthorizationModes::default()
        };
        let resolved = resolve_authorization_modes(&modes, None, &get_instance_props()).unwrap();
        assert_eq!(resolved.default_mode, AuthorizationModeKind::ApiKey);
        assert_eq!(resolved.additional_modes, vec![AuthorizationModeKind::Iam]);
        assert_eq!(resolved.api_key_expiration_days, Some(30));
    }

    #[test]
    fn user_pool_mode_requires_auth() {
        let modes = AuthorizationModes {
            default_authorization_mode: Some(AuthorizationModeKind::UserPool),
            ..AuthorizationModes::default()
        };
        let err = resolve_authorization_modes(&modes, None, &get_instance_props()).unwrap_err();
        assert_eq!(err.code(), DATA_CONFIGURATION_ERROR);
    }

    #[test]
    fn logging_defaults() {
        assert_eq!(
            resolve_logging(DataLogging::default()),
            ResolvedDataLogging {
                exclude_verbose_content: true,
                field_log_level: FieldLogLevel::None,
                retention: LogRetention::ONE_WEEK,
            }
        );
        let custom = resolve_logging(DataLogging {
            field_log_level: Some(FieldLogLevel::Error),
            retention: Some("1 month".parse().unwrap()),
            ..DataLogging::default()
        });
        assert_eq!(custom.field_log_level, FieldLogLevel::Error);
        assert_eq!(custom.retention.days(), Some(30));
        assert!(custom.exclude_verbose_content);
    }

    #[test]
    fn sandbox_selects_sandbox_mapping() {
        let mappings = vec![mapping("main", "Todo", "Todo-main"), mapping("sandbox", "Todo", "Todo-dev")];
        let sandbox = BackendIdentifier::sandbox("app", "alice");
        assert_eq!(
            select_table_mapping(&mappings, &sandbox).unwrap(),
            BTreeMap::from([("Todo".to_string(), "Todo-dev".to_string())])
        );

        let branch = BackendIdentifier::branch("app", "main");
        assert_eq!(select_table_mapping(&mappings, &branch).unwrap()["Todo"], "Todo-main");

        let other = BackendIdentifier::branch("app", "feature");
        assert!(select_table_mapping(&mappings, &other).unwrap().is_empty());
    }

    #[test]
    fn duplicate_branch_mappings_are_rejected() {
        let mappings = vec![mapping("main", "Todo", "a"), mapping("main", "Todo", "b")];
        let err = select_table_mapping(&mappings, &BackendIdentifier::branch("app", "main")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Branch names must be unique in the migratedAmplifyGen1DynamoDbTableMappings"
        );
    }
}
