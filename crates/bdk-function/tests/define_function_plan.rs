//! Functional tests for function definitions inside a backend.
//!
//! These tests go through `Backend::synthesize`:
//! - every function gets its own lambda in the shared function stack
//! - schedules and log retention add their own resources
//! - functions resolve as trigger handlers of other resources

use bdk_function::{define_function, FunctionLogging, FunctionProps, LAMBDA_FUNCTION_TYPE};
use bdk_platform::{resource_group, BuildSession, FunctionHandlerFactory, LogRetention};
use bdk_test_utils::setup_test_backend;
use pretty_assertions::assert_eq;

/// Tenet: many functions share one stack and each synthesizes once.
#[test]
fn functions_share_the_function_stack() {
    let session = BuildSession::new();
    let mut backend = setup_test_backend();
    backend
        .add("first", define_function(&session, FunctionProps::new().with_name("first")))
        .add("second", define_function(&session, FunctionProps::new().with_name("second")));

    backend.synthesize().unwrap();

    let stack = backend
        .construct_container()
        .stack_resolver()
        .get_stack_for(resource_group::FUNCTION);
    assert_eq!(stack.resources_of_type(LAMBDA_FUNCTION_TYPE).len(), 2);
    assert_eq!(backend.construct_container().len(), 2);
}

/// Tenet: each schedule is one rule and retention adds a retention resource.
#[test]
fn schedules_and_retention_create_resources() {
    let session = BuildSession::new();
    let mut backend = setup_test_backend();
    let props = FunctionProps::new()
        .with_name("cleanup")
        .with_schedule("0 1 * * ?")
        .with_schedule("every 5m")
        .with_logging(FunctionLogging {
            retention: Some("13 months".parse::<LogRetention>().unwrap()),
            ..FunctionLogging::default()
        });
    backend.add("cleanup", define_function(&session, props));

    backend.synthesize().unwrap();

    let stack = backend
        .construct_container()
        .stack_resolver()
        .get_stack_for(resource_group::FUNCTION);
    assert_eq!(stack.resources_of_type("AWS::Events::Rule").len(), 2);
    assert_eq!(stack.resources_of_type("Custom::LogRetention").len(), 1);
}

/// Tenet: a function used as a handler resolves to the same lambda as its instance.
#[test]
fn handler_resolution_reuses_the_instance() {
    let backend = setup_test_backend();
    let props = backend.get_instance_props();
    let factory = define_function(&BuildSession::new(), FunctionProps::new().with_name("handler"));

    let via_handler = factory.resolve_function_resources(props).unwrap();
    let instance = bdk_platform::ConstructFactory::get_instance(factory.as_ref(), props).unwrap();

    assert!(std::sync::Arc::ptr_eq(
        &via_handler.lambda,
        &bdk_platform::ResourceProvider::resources(instance.as_ref()).lambda
    ));
}

/// Tenet: invalid props fail synthesis with the validation error code.
#[test]
fn invalid_props_fail_synthesis() {
    let mut backend = setup_test_backend();
    backend.add(
        "broken",
        define_function(&BuildSession::new(), FunctionProps::new().with_runtime(14)),
    );

    let err = backend.synthesize().unwrap_err();
    assert_eq!(err.code(), "InvalidRuntimeError");
}
