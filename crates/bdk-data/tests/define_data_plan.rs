//! Functional tests for `define_data` inside a backend.
//!
//! Covered:
//! - default authorization follows the presence of auth
//! - schema functions become Lambda data sources
//! - access grants attach one merged policy per grant to function roles
//! - singleton, friendly name and output entry

use bdk_auth::{define_auth, AuthProps};
use bdk_data::{
    define_data, AuthorizationModeKind, AuthorizationModes, DataAction, DataLogging, DataProps, DATA_SOURCE_TYPE,
    TABLE_TYPE,
};
use bdk_function::{define_function, FunctionProps, SSM_ENV_CONFIG_KEY};
use bdk_platform::{
    access, resource_group, BuildSession, ConstructFactory, ResourceProvider, GRAPHQL_OUTPUT_KEY,
};
use bdk_test_utils::setup_test_backend;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const SCHEMA: &str = r#"
    type Todo @model {
      content: String
    }
"#;

const ECHO_SCHEMA: &str = r#"
    type Todo @model {
      content: String
    }

    type Query {
      echo(message: String!): String! @function(name: "echo")
    }
"#;

/// Tenet: with auth registered and no modes configured the API defaults to user pool auth.
#[test]
fn defaults_to_user_pool_with_auth() {
    let session = BuildSession::new();
    let mut backend = setup_test_backend();
    backend
        .add("auth", define_auth(&session, AuthProps::email()).unwrap())
        .add("data", define_data(&session, DataProps::new(SCHEMA)).unwrap());

    backend.synthesize().unwrap();

    let output = backend.output_storage().get(GRAPHQL_OUTPUT_KEY).unwrap();
    assert_eq!(output.payload["awsAppsyncAuthenticationType"], "AMAZON_COGNITO_USER_POOLS");
    assert_eq!(output.payload["awsAppsyncAdditionalAuthenticationTypes"], "AWS_IAM");
}

/// Tenet: definition order does not matter; data added before auth still finds it.
#[test]
fn auth_is_found_regardless_of_order() {
    let session = BuildSession::new();
    let mut backend = setup_test_backend();
    backend
        .add("data", define_data(&session, DataProps::new(SCHEMA)).unwrap())
        .add("auth", define_auth(&session, AuthProps::email()).unwrap());

    backend.synthesize().unwrap();

    let output = backend.output_storage().get(GRAPHQL_OUTPUT_KEY).unwrap();
    assert_eq!(output.payload["awsAppsyncAuthenticationType"], "AMAZON_COGNITO_USER_POOLS");
}

/// Tenet: without auth the API defaults to IAM.
#[test]
fn defaults_to_iam_without_auth() {
    let mut backend = setup_test_backend();
    backend.add("data", define_data(&BuildSession::new(), DataProps::new(SCHEMA)).unwrap());

    backend.synthesize().unwrap();

    let output = backend.output_storage().get(GRAPHQL_OUTPUT_KEY).unwrap();
    assert_eq!(output.payload["awsAppsyncAuthenticationType"], "AWS_IAM");
    assert!(!output.payload.contains_key("awsAppsyncAdditionalAuthenticationTypes"));
}

/// Tenet: an explicit API key default enables the key and lists IAM as additional mode.
#[test]
fn api_key_default_mode() {
    let modes = AuthorizationModes {
        default_authorization_mode: Some(AuthorizationModeKind::ApiKey),
        ..AuthorizationModes::default()
    };
    let mut backend = setup_test_backend();
    backend.add(
        "data",
        define_data(&BuildSession::new(), DataProps::new(SCHEMA).with_authorization_modes(modes)).unwrap(),
    );

    backend.synthesize().unwrap();

    let output = backend.output_storage().get(GRAPHQL_OUTPUT_KEY).unwrap();
    assert_eq!(output.payload["awsAppsyncAuthenticationType"], "API_KEY");
    assert!(output.payload.contains_key("awsAppsyncApiKey"));
}

/// Tenet: every schema function becomes one Lambda data source in the data stack.
#[test]
fn functions_become_data_sources() {
    let session = BuildSession::new();
    let echo = define_function(&session, FunctionProps::new().with_name("echo"));
    let data = define_data(&session, DataProps::new(ECHO_SCHEMA).with_function("echo", echo.clone())).unwrap();
    let mut backend = setup_test_backend();
    backend.add("data", data.clone());

    backend.synthesize().unwrap();

    let container = backend.construct_container();
    let data_stack = container.stack_resolver().get_stack_for(resource_group::DATA);
    let sources = data_stack.resources_of_type(DATA_SOURCE_TYPE);
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].logical_id, "EchoLambdaDataSource");
    assert_eq!(data_stack.resources_of_type(TABLE_TYPE).len(), 1);

    let props = backend.get_instance_props();
    let function = echo.get_instance(props).unwrap();
    let data = data.get_instance(props).unwrap();
    assert!(Arc::ptr_eq(
        &data.resources().function_data_sources["echo"],
        &function.resources().lambda
    ));
}

/// Tenet: a default grant gives the function role one policy with two merged statements.
#[test]
fn access_grant_attaches_graphql_policy() {
    let session = BuildSession::new();
    let reader = define_function(&session, FunctionProps::new().with_name("reader"));
    let grantee = reader.clone();
    let props = DataProps::new(SCHEMA).with_access(access(move |allow| vec![allow.resource(grantee.clone())]));
    let mut backend = setup_test_backend();
    let data = define_data(&session, props).unwrap();
    backend.add("data", data.clone()).add("reader", reader.clone());

    backend.synthesize().unwrap();

    let props = backend.get_instance_props();
    let lambda = Arc::clone(&reader.get_instance(props).unwrap().resources().lambda);
    let policies = lambda.role().attached_policies();
    assert_eq!(policies.len(), 1);

    let statements = policies[0].statements();
    assert_eq!(statements.len(), 2);
    let api_arn = data.get_instance(props).unwrap().resources().graphql_api_arn.clone();
    assert_eq!(
        statements[0].resources(),
        &[
            format!("{api_arn}/types/Query/*"),
            format!("{api_arn}/types/Mutation/*"),
            format!("{api_arn}/types/Subscription/*"),
        ]
    );

    let ssm_config = lambda.environment_value(SSM_ENV_CONFIG_KEY).unwrap();
    assert!(ssm_config.contains("amplifyData_GRAPHQL_ENDPOINT"));
    assert!(ssm_config.contains("amplifyData_MODEL_INTROSPECTION_SCHEMA_BUCKET_NAME"));
}

/// Tenet: a query-only grant covers only the Query type.
#[test]
fn query_only_grant() {
    let session = BuildSession::new();
    let reader = define_function(&session, FunctionProps::new().with_name("reader"));
    let grantee = reader.clone();
    let props = DataProps::new(SCHEMA).with_access(access(move |allow| {
        vec![allow.resource(grantee.clone()).to([DataAction::Query])]
    }));
    let mut backend = setup_test_backend();
    backend.add("data", define_data(&session, props).unwrap());

    backend.synthesize().unwrap();

    let function = reader.get_instance(backend.get_instance_props()).unwrap();
    let policies = function.resources().lambda.role().attached_policies();
    let resources = policies[0].statements()[0].resources().to_vec();
    assert_eq!(resources.len(), 1);
    assert!(resources[0].ends_with("/types/Query/*"));
}

/// Tenet: a second `define_data` in one session is rejected.
#[test]
fn duplicate_data_is_rejected() {
    let session = BuildSession::new();
    define_data(&session, DataProps::new(SCHEMA)).unwrap();
    let err = define_data(&session, DataProps::new(SCHEMA)).unwrap_err();

    assert_eq!(err.code(), "MultipleSingletonResourcesError");
    assert_eq!(
        err.to_string(),
        "Multiple `defineData` calls are not allowed within an Amplify backend"
    );
}

/// Tenet: the construct carries the friendly-name tag and logging defaults apply.
#[test]
fn friendly_name_and_logging() {
    let backend = setup_test_backend();
    let data = define_data(
        &BuildSession::new(),
        DataProps::new(SCHEMA)
            .with_name("todoApi")
            .with_logging(DataLogging::default()),
    )
    .unwrap();

    let instance = data.get_instance(backend.get_instance_props()).unwrap();
    assert_eq!(instance.construct().tags().friendly_name().as_deref(), Some("todoApi"));

    let logging = instance.resources().logging.unwrap();
    assert!(logging.exclude_verbose_content);
    assert_eq!(logging.retention.days(), Some(7));
}

/// Tenet: several modes without a default fail synthesis with a configuration error.
#[test]
fn multiple_modes_without_default_fail() {
    let modes = AuthorizationModes {
        api_key: Some(bdk_data::ApiKeyAuthorizationMode::default()),
        lambda: Some(bdk_data::LambdaAuthorizationMode {
            function: define_function(&BuildSession::new(), FunctionProps::new().with_name("authorizer")),
            time_to_live_in_seconds: 60,
        }),
        ..AuthorizationModes::default()
    };
    let mut backend = setup_test_backend();
    backend.add(
        "data",
        define_data(&BuildSession::new(), DataProps::new(SCHEMA).with_authorization_modes(modes)).unwrap(),
    );

    let err = backend.synthesize().unwrap_err();
    assert_eq!(err.code(), "DefineDataConfigurationError");
}

/// Tenet: every function the schema references must be provided.
#[test]
fn unprovided_schema_function_fails() {
    let mut backend = setup_test_backend();
    backend.add("data", define_data(&BuildSession::new(), DataProps::new(ECHO_SCHEMA)).unwrap());

    let err = backend.synthesize().unwrap_err();
    assert_eq!(err.code(), "DefineDataConfigurationError");
    assert_eq!(
        err.to_string(),
        "Function `echo` is referenced in the schema but was not provided to defineData"
    );
}
