//! Functional tests for the construct container and access arbitration.
//!
//! These tests exercise the composition engine through its public surface:
//! - factories resolve to one shared instance per backend
//! - access grants become one attached policy per grant
//! - independent builds never share definition state

use bdk_platform::{
    AccessAction, AccessBuilder, AccessPolicyArbiter, AccessPolicyFactory, BuildSession,
    ConstructFactory, PolicyStatement, SingletonKind,
};
use bdk_test_utils::{get_instance_props, StubFunctionFactory};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueAction {
    Send,
    Receive,
}

impl AccessAction for QueueAction {
    fn default_actions() -> Vec<Self> {
        vec![Self::Send]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Receive => "receive",
        }
    }
}

struct QueuePolicyFactory {
    queue_arn: String,
}

impl AccessPolicyFactory<QueueAction> for QueuePolicyFactory {
    fn statements_for(&self, action: QueueAction) -> Vec<PolicyStatement> {
        let actions: &[&str] = match action {
            QueueAction::Send => &["sqs:SendMessage"],
            QueueAction::Receive => &["sqs:ReceiveMessage", "sqs:DeleteMessage"],
        };
        vec![PolicyStatement::allow(
            actions.iter().copied(),
            [self.queue_arn.clone()],
        )]
    }
}

/// Tenet: N `get_instance` calls return the same reference and generate once.
#[test]
fn get_instance_returns_identical_reference() {
    let props = get_instance_props();
    let factory = StubFunctionFactory::new("worker");

    let instances: Vec<_> = (0..5).map(|_| factory.get_instance(&props).unwrap()).collect();

    assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(factory.generations(), 1);
}

/// Tenet: the arbiter resolves grantees lazily, so grants may reference
/// resources nobody has resolved yet.
#[test]
fn arbiter_constructs_unresolved_grantee() {
    let props = get_instance_props();
    let worker = StubFunctionFactory::new("worker");
    assert_eq!(worker.generations(), 0);

    let allow = AccessBuilder::<QueueAction>::new();
    let grants = vec![allow.resource(worker.clone())];
    let policy_factory = QueuePolicyFactory {
        queue_arn: "arn:aws:sqs:us-east-1:000000000000:jobs".into(),
    };
    AccessPolicyArbiter::new("jobs", grants, &props, vec![], &policy_factory)
        .arbitrate_policies()
        .unwrap();

    assert_eq!(worker.generations(), 1);
    let instance = worker.get_instance(&props).unwrap();
    assert_eq!(instance.acceptor.accepted().len(), 1);
}

/// Tenet: two grants to one consumer attach two policies, in declaration order.
#[test]
fn grants_to_same_consumer_are_not_merged() {
    let props = get_instance_props();
    let worker = StubFunctionFactory::new("worker");
    let allow = AccessBuilder::<QueueAction>::new();
    let grants = vec![
        allow.resource(worker.clone()).to([QueueAction::Receive]),
        allow.resource(worker.clone()).to([QueueAction::Send]),
    ];
    let policy_factory = QueuePolicyFactory {
        queue_arn: "arn:q".into(),
    };

    AccessPolicyArbiter::new("jobs", grants, &props, vec![], &policy_factory)
        .arbitrate_policies()
        .unwrap();

    let instance = worker.get_instance(&props).unwrap();
    let attached = instance.lambda().role().attached_policies();
    assert_eq!(attached.len(), 2);
    assert_eq!(
        attached[0].statements()[0].actions(),
        &["sqs:ReceiveMessage".to_string(), "sqs:DeleteMessage".to_string()]
    );
    assert_eq!(attached[1].statements()[0].actions(), &["sqs:SendMessage".to_string()]);
}

/// Tenet: definition counting is scoped to a build session.
#[test]
fn duplicate_definitions_are_scoped_to_session() {
    const QUEUE: SingletonKind = SingletonKind {
        name: "queue",
        message: "Multiple `defineQueue` calls are not allowed within a backend",
        resolution: "Remove all but one `defineQueue` call",
    };

    let first = BuildSession::new();
    first.register_singleton(&QUEUE).unwrap();
    assert!(first.register_singleton(&QUEUE).is_err());

    let second = BuildSession::new();
    assert!(second.register_singleton(&QUEUE).is_ok());
}
