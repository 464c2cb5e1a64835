//! Resource handles and capability interfaces
//!
//! Handles model the infrastructure resources other resource groups may
//! reference (lambda functions, user pools, roles). Every resource provider
//! exposes a fixed set of named capabilities:
//! - [`ResourceProvider`]: typed access to its resource handles
//! - [`StackProvider`]: the stack that owns those resources
//! - [`ResourceAccessAcceptorFactory`](crate::access::ResourceAccessAcceptorFactory):
//!   attaching policies to its roles

use crate::construct::{Stack, Tags};
use crate::error::ConstructError;
use crate::iam::Role;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Typed resource handles of a provider
pub trait ResourceProvider {
    /// Handle bundle
    type Resources;

    /// Resource handles
    fn resources(&self) -> &Self::Resources;
}

/// Owning stack of a provider
pub trait StackProvider {
    /// Owning stack
    fn stack(&self) -> &Arc<Stack>;
}

/// Deployed function
#[derive(Debug)]
pub struct LambdaFunction {
    function_name: String,
    function_arn: String,
    role: Arc<Role>,
    environment: RwLock<BTreeMap<String, String>>,
    tags: Tags,
}

impl LambdaFunction {
    /// Create function handle executing under `role`
    #[must_use]
    pub fn new(function_name: impl Into<String>, function_arn: impl Into<String>, role: Arc<Role>) -> Self {
        Self {
            function_name: function_name.into(),
            function_arn: function_arn.into(),
            role,
            environment: RwLock::new(BTreeMap::new()),
            tags: Tags::new(),
        }
    }

    /// Physical function name
    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Function ARN
    #[inline]
    #[must_use]
    pub fn function_arn(&self) -> &str {
        &self.function_arn
    }

    /// Execution role
    #[inline]
    #[must_use]
    pub fn role(&self) -> &Arc<Role> {
        &self.role
    }

    /// Set an environment variable
    pub fn add_environment(&self, key: impl Into<String>, value: impl Into<String>) {
        self.environment.write().insert(key.into(), value.into());
    }

    /// Environment variable value
    #[must_use]
    pub fn environment_value(&self, key: &str) -> Option<String> {
        self.environment.read().get(key).cloned()
    }

    /// Snapshot of the environment
    #[must_use]
    pub fn environment(&self) -> BTreeMap<String, String> {
        self.environment.read().clone()
    }

    /// Function tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}

/// Handles of a function resource
#[derive(Debug, Clone)]
pub struct FunctionResources {
    /// Deployed function
    pub lambda: Arc<LambdaFunction>,
}

/// Cognito user pool
///
/// Trigger wiring is additive: attaching a handler never clears handlers
/// attached for other events.
#[derive(Debug)]
pub struct UserPool {
    user_pool_id: String,
    user_pool_arn: String,
    triggers: RwLock<BTreeMap<String, Arc<LambdaFunction>>>,
    kms_key_arn: RwLock<Option<String>>,
}

impl UserPool {
    /// Create user pool handle
    #[must_use]
    pub fn new(user_pool_id: impl Into<String>, user_pool_arn: impl Into<String>) -> Self {
        Self {
            user_pool_id: user_pool_id.into(),
            user_pool_arn: user_pool_arn.into(),
            triggers: RwLock::new(BTreeMap::new()),
            kms_key_arn: RwLock::new(None),
        }
    }

    /// User pool id
    #[inline]
    #[must_use]
    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    /// User pool ARN
    #[inline]
    #[must_use]
    pub fn user_pool_arn(&self) -> &str {
        &self.user_pool_arn
    }

    /// Attach a handler for a lifecycle event
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError::DuplicateTrigger`] if the event already has a handler.
    pub fn add_trigger(&self, event: &str, handler: Arc<LambdaFunction>) -> Result<(), ConstructError> {
        let mut triggers = self.triggers.write();
        if triggers.contains_key(event) {
            return Err(ConstructError::DuplicateTrigger {
                event: event.to_string(),
                user_pool: self.user_pool_id.clone(),
            });
        }
        tracing::debug!(event, handler = handler.function_name(), "attaching user pool trigger");
        triggers.insert(event.to_string(), handler);
        Ok(())
    }

    /// Handler attached for an event
    #[must_use]
    pub fn trigger(&self, event: &str) -> Option<Arc<LambdaFunction>> {
        self.triggers.read().get(event).cloned()
    }

    /// Events that have a handler
    #[must_use]
    pub fn trigger_events(&self) -> Vec<String> {
        self.triggers.read().keys().cloned().collect()
    }

    /// Key used to encrypt codes handed to custom senders
    #[must_use]
    pub fn kms_key_arn(&self) -> Option<String> {
        self.kms_key_arn.read().clone()
    }

    /// Set the custom sender encryption key
    pub fn set_kms_key_arn(&self, arn: impl Into<String>) {
        *self.kms_key_arn.write() = Some(arn.into());
    }
}

/// User pool group with its own role
#[derive(Debug, Clone)]
pub struct UserPoolGroup {
    /// Group name
    pub name: String,
    /// Role assumed by group members
    pub role: Arc<Role>,
    /// Precedence among groups, lower wins
    pub precedence: Option<u32>,
}

/// Handles of an auth resource
#[derive(Debug, Clone)]
pub struct AuthResources {
    /// User pool
    pub user_pool: Arc<UserPool>,
    /// Web client id
    pub user_pool_client_id: String,
    /// Identity pool id
    pub identity_pool_id: String,
    /// Role of signed-in users
    pub authenticated_user_iam_role: Arc<Role>,
    /// Role of guests
    pub unauthenticated_user_iam_role: Arc<Role>,
    /// Groups by name
    pub groups: BTreeMap<String, UserPoolGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lambda(name: &str) -> Arc<LambdaFunction> {
        Arc::new(LambdaFunction::new(
            name,
            format!("arn:aws:lambda:us-east-1:1:function:{name}"),
            Arc::new(Role::new(format!("{name}Role"), "arn:aws:iam::1:role/r")),
        ))
    }

    #[test]
    fn triggers_are_additive() {
        let pool = UserPool::new("pool", "arn:pool");
        pool.add_trigger("preSignUp", lambda("a")).unwrap();
        pool.add_trigger("postConfirmation", lambda("b")).unwrap();

        assert_eq!(pool.trigger_events(), vec!["postConfirmation", "preSignUp"]);
    }

    #[test]
    fn duplicate_trigger_is_rejected() {
        let pool = UserPool::new("pool", "arn:pool");
        pool.add_trigger("preSignUp", lambda("a")).unwrap();
        let err = pool.add_trigger("preSignUp", lambda("b")).unwrap_err();

        assert!(matches!(err, ConstructError::DuplicateTrigger { .. }));
        assert_eq!(
            pool.trigger("preSignUp").map(|f| f.function_name().to_string()).as_deref(),
            Some("a")
        );
    }

    #[test]
    fn lambda_environment_accumulates() {
        let f = lambda("fn");
        f.add_environment("A", "1");
        f.add_environment("B", "2");
        assert_eq!(f.environment().len(), 2);
        assert_eq!(f.environment_value("A").as_deref(), Some("1"));
    }
}
