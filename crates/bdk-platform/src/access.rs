//! Access builder and policy arbiter
//!
//! A resource that owns an access callback (`allow => [...]`) hands it an
//! [`AccessBuilder`]. The callback returns ordered [`ResourceAccessGrant`]s,
//! each naming a grantee factory and a set of actions from the resource
//! kind's closed vocabulary. No validation happens while building.
//!
//! [`AccessPolicyArbiter::arbitrate_policies`] then, per grant:
//! 1. resolves the grantee's instance (constructing it if needed)
//! 2. translates the actions into statements via an [`AccessPolicyFactory`]
//! 3. builds exactly one [`Policy`] for the grant
//! 4. hands policy and SSM entries to the grantee's [`ResourceAccessAcceptor`]

use crate::error::Result;
use crate::factory::{ConstructFactoryGetInstanceProps, ResourceAccessGrantee};
use crate::iam::{merge_statements, Policy, PolicyStatement};
use crate::ssm::SsmEnvironmentEntry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Capability bound to one role: attaches policies to it
pub trait ResourceAccessAcceptor: Send + Sync {
    /// Stable identifier of the bound role
    fn identifier(&self) -> &str;

    /// Attach `policy` and expose the SSM entries to the role's consumer
    ///
    /// # Errors
    ///
    /// Acceptor specific attachment errors.
    fn accept_resource_access(&self, policy: Arc<Policy>, ssm_environment_entries: &[SsmEnvironmentEntry]) -> Result<()>;
}

/// Hands out acceptors for the roles a resource owns
pub trait ResourceAccessAcceptorFactory: Send + Sync {
    /// Acceptor for `role_identifier`, or the resource's only role when `None`
    ///
    /// # Errors
    ///
    /// [`BackendError::InvalidResourceAccessConfig`](crate::BackendError::InvalidResourceAccessConfig)
    /// for unknown role identifiers.
    fn get_resource_access_acceptor(&self, role_identifier: Option<&str>) -> Result<Arc<dyn ResourceAccessAcceptor>>;
}

/// Closed action vocabulary of a resource kind
pub trait AccessAction: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Actions granted by `allow.resource(f)` without `.to(...)`
    fn default_actions() -> Vec<Self>;

    /// Action name as written by users
    fn name(self) -> &'static str;
}

/// One `{grantee, actions}` pair
pub struct ResourceAccessGrant<A> {
    grantee: Arc<dyn ResourceAccessGrantee>,
    actions: Vec<A>,
}

impl<A: AccessAction> ResourceAccessGrant<A> {
    /// Replace the granted actions; duplicates are dropped, order kept
    #[must_use]
    pub fn to<I: IntoIterator<Item = A>>(mut self, actions: I) -> Self {
        self.actions.clear();
        for action in actions {
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
        self
    }

    /// Granted actions
    #[inline]
    #[must_use]
    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    /// Grantee factory
    #[inline]
    #[must_use]
    pub fn grantee(&self) -> &Arc<dyn ResourceAccessGrantee> {
        &self.grantee
    }
}

impl<A: fmt::Debug> fmt::Debug for ResourceAccessGrant<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceAccessGrant")
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

/// The `allow` handle passed to access callbacks
#[derive(Debug)]
pub struct AccessBuilder<A> {
    _actions: PhantomData<fn() -> A>,
}

impl<A: AccessAction> AccessBuilder<A> {
    /// Create builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            _actions: PhantomData,
        }
    }

    /// Grant to `grantee`, starting from the kind's default actions
    #[must_use]
    pub fn resource(&self, grantee: Arc<dyn ResourceAccessGrantee>) -> ResourceAccessGrant<A> {
        ResourceAccessGrant {
            grantee,
            actions: A::default_actions(),
        }
    }
}

impl<A: AccessAction> Default for AccessBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// User access callback
pub type AccessGenerator<A> = Arc<dyn Fn(&AccessBuilder<A>) -> Vec<ResourceAccessGrant<A>> + Send + Sync>;

/// Wrap a closure as an [`AccessGenerator`]
pub fn access<A, F>(callback: F) -> AccessGenerator<A>
where
    A: AccessAction,
    F: Fn(&AccessBuilder<A>) -> Vec<ResourceAccessGrant<A>> + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Per-kind translation from logical actions to IAM statements
pub trait AccessPolicyFactory<A>: Send + Sync {
    /// Statements for one action
    fn statements_for(&self, action: A) -> Vec<PolicyStatement>;
}

/// Turns grants into attached policies
pub struct AccessPolicyArbiter<'a, A> {
    resource_name: String,
    grants: Vec<ResourceAccessGrant<A>>,
    get_instance_props: &'a ConstructFactoryGetInstanceProps,
    ssm_environment_entries: Vec<SsmEnvironmentEntry>,
    policy_factory: &'a dyn AccessPolicyFactory<A>,
}

impl<'a, A: AccessAction> AccessPolicyArbiter<'a, A> {
    /// Create arbiter for the grants of resource `resource_name`
    #[must_use]
    pub fn new(
        resource_name: impl Into<String>,
        grants: Vec<ResourceAccessGrant<A>>,
        get_instance_props: &'a ConstructFactoryGetInstanceProps,
        ssm_environment_entries: Vec<SsmEnvironmentEntry>,
        policy_factory: &'a dyn AccessPolicyFactory<A>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            grants,
            get_instance_props,
            ssm_environment_entries,
            policy_factory,
        }
    }

    /// Build one policy per grant and hand it to the grantee's acceptor
    ///
    /// Policies are accepted in declaration order. Returns them in that order.
    ///
    /// # Errors
    ///
    /// The first error from resolving a grantee or accepting a policy.
    pub fn arbitrate_policies(&self) -> Result<Vec<Arc<Policy>>> {
        let mut policies = Vec::with_capacity(self.grants.len());
        for (index, grant) in self.grants.iter().enumerate() {
            let acceptor_factory = grant
                .grantee
                .resolve_access_acceptor_factory(self.get_instance_props)?;
            let acceptor = acceptor_factory.get_resource_access_acceptor(None)?;

            let policy = Arc::new(self.policy_for(index, grant, acceptor.identifier()));
            tracing::debug!(
                resource = %self.resource_name,
                acceptor = acceptor.identifier(),
                actions = ?grant.actions,
                statements = policy.statements().len(),
                "arbitrated access policy"
            );
            acceptor.accept_resource_access(Arc::clone(&policy), &self.ssm_environment_entries)?;
            policies.push(policy);
        }
        Ok(policies)
    }

    fn policy_for(&self, index: usize, grant: &ResourceAccessGrant<A>, acceptor: &str) -> Policy {
        let statements = grant
            .actions
            .iter()
            .flat_map(|action| self.policy_factory.statements_for(*action))
            .collect();
        Policy::new(
            format!("{}{acceptor}AccessPolicy{index}", self.resource_name),
            merge_statements(statements),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::construct::StackResolver;
    use crate::container::ConstructContainer;
    use crate::factory::ConstructFactory;
    use crate::identifiers::{BackendIdentifier, StableBackendIdentifiers};
    use crate::output::InMemoryBackendOutputStorage;
    use crate::secrets::DefaultBackendSecretResolver;
    use crate::ssm::SsmEnvironmentEntriesGenerator;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verb {
        Read,
        Write,
    }

    impl AccessAction for Verb {
        fn default_actions() -> Vec<Self> {
            vec![Self::Read]
        }

        fn name(self) -> &'static str {
            match self {
                Self::Read => "read",
                Self::Write => "write",
            }
        }
    }

    struct Table;

    impl AccessPolicyFactory<Verb> for Table {
        fn statements_for(&self, action: Verb) -> Vec<PolicyStatement> {
            match action {
                Verb::Read => vec![PolicyStatement::allow(["svc:Get"], ["arn:table"])],
                Verb::Write => vec![
                    PolicyStatement::allow(["svc:Put"], ["arn:table"]),
                    PolicyStatement::allow(["svc:Get"], ["arn:index"]),
                ],
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        accepted: Mutex<Vec<Arc<Policy>>>,
    }

    impl ResourceAccessAcceptor for Recorder {
        fn identifier(&self) -> &str {
            "recorder"
        }

        fn accept_resource_access(&self, policy: Arc<Policy>, _entries: &[SsmEnvironmentEntry]) -> Result<()> {
            self.accepted.lock().push(policy);
            Ok(())
        }
    }

    struct Consumer(Arc<Recorder>);

    impl ResourceAccessAcceptorFactory for Consumer {
        fn get_resource_access_acceptor(&self, role: Option<&str>) -> Result<Arc<dyn ResourceAccessAcceptor>> {
            match role {
                None => Ok(self.0.clone()),
                Some(other) => Err(BackendError::InvalidResourceAccessConfig {
                    message: format!("unknown role {other}"),
                    resolution: String::new(),
                }),
            }
        }
    }

    struct ConsumerFactory(Arc<Consumer>);

    impl ConstructFactory for ConsumerFactory {
        type Output = Consumer;

        fn get_instance(&self, _props: &ConstructFactoryGetInstanceProps) -> Result<Arc<Consumer>> {
            Ok(Arc::clone(&self.0))
        }
    }

    #[test]
    fn builder_defaults_and_to() {
        let consumer = Arc::new(ConsumerFactory(Arc::new(Consumer(Arc::default()))));
        let allow = AccessBuilder::<Verb>::new();

        let default = allow.resource(consumer.clone());
        assert_eq!(default.actions(), &[Verb::Read]);

        let explicit = allow.resource(consumer).to([Verb::Write, Verb::Write, Verb::Read]);
        assert_eq!(explicit.actions(), &[Verb::Write, Verb::Read]);
        assert_eq!(Verb::Write.name(), "write");
    }

    fn props() -> ConstructFactoryGetInstanceProps {
        let id = BackendIdentifier::sandbox("app", "test");
        let container = ConstructContainer::new(
            StackResolver::new("root", "us-east-1", "1"),
            Arc::new(DefaultBackendSecretResolver::new(id.clone())),
            SsmEnvironmentEntriesGenerator::new(id.clone()),
            StableBackendIdentifiers::new(id),
        );
        ConstructFactoryGetInstanceProps::new(
            Arc::new(container),
            Arc::new(InMemoryBackendOutputStorage::new()),
        )
    }

    #[test]
    fn one_policy_per_grant_in_declaration_order() {
        let recorder = Arc::new(Recorder::default());
        let consumer = Arc::new(ConsumerFactory(Arc::new(Consumer(Arc::clone(&recorder)))));
        let allow = AccessBuilder::<Verb>::new();
        let grants = vec![
            allow.resource(consumer.clone()).to([Verb::Read, Verb::Write]),
            allow.resource(consumer),
        ];
        let props = props();
        let table = Table;

        let arbiter = AccessPolicyArbiter::new("table", grants, &props, vec![], &table);
        let policies = arbiter.arbitrate_policies().unwrap();

        let accepted = recorder.accepted.lock().clone();
        assert_eq!(accepted.len(), 2);
        assert!(Arc::ptr_eq(&accepted[0], &policies[0]));
        assert!(Arc::ptr_eq(&accepted[1], &policies[1]));

        // Read and Write share `svc:Get`, merged into one statement
        assert_eq!(policies[0].statements().len(), 2);
        assert_eq!(
            policies[0].statements()[0].resources(),
            &["arn:table".to_string(), "arn:index".to_string()]
        );
        assert_eq!(policies[1].statements().len(), 1);
        assert_ne!(policies[0].name(), policies[1].name());
    }
}
