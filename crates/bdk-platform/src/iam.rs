//! IAM model
//!
//! Minimal policy and role model used by access arbitration:
//! - [`PolicyStatement`]: allow statement over a set of actions and resources
//! - [`Policy`]: named group of statements, rendered as an IAM document
//! - [`Role`]: role that policies are attached to

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// IAM policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Allow statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<String>,
}

impl PolicyStatement {
    /// Create statement; duplicate actions and resources are dropped, order kept
    #[must_use]
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let mut statement = Self {
            actions: Vec::new(),
            resources: Vec::new(),
        };
        for action in actions {
            push_unique(&mut statement.actions, action.into());
        }
        for resource in resources {
            push_unique(&mut statement.resources, resource.into());
        }
        statement
    }

    /// IAM actions
    #[inline]
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Resource ARNs
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Add resources not already covered
    pub fn add_resources<I: IntoIterator<Item = String>>(&mut self, resources: I) {
        for resource in resources {
            push_unique(&mut self.resources, resource);
        }
    }

    /// Render as an IAM statement; single values render as scalars
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "Effect": "Allow",
            "Action": scalar_or_list(&self.actions),
            "Resource": scalar_or_list(&self.resources),
        })
    }
}

/// Merge statements that share the same action list
///
/// Resources of merged statements are unioned; the position of the first
/// statement with a given action list is kept.
#[must_use]
pub fn merge_statements(statements: Vec<PolicyStatement>) -> Vec<PolicyStatement> {
    let mut merged: Vec<PolicyStatement> = Vec::with_capacity(statements.len());
    for statement in statements {
        match merged.iter_mut().find(|s| s.actions == statement.actions) {
            Some(existing) => existing.add_resources(statement.resources),
            None => merged.push(statement),
        }
    }
    merged
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn scalar_or_list(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        many => Value::from(many.to_vec()),
    }
}

/// Named IAM policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: String,
    statements: Vec<PolicyStatement>,
}

impl Policy {
    /// Create policy
    #[must_use]
    pub fn new(name: impl Into<String>, statements: Vec<PolicyStatement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }

    /// Policy name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Statements
    #[inline]
    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Render as an IAM policy document
    #[must_use]
    pub fn to_document(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements.iter().map(PolicyStatement::to_json).collect::<Vec<_>>(),
        })
    }
}

/// IAM role
#[derive(Debug)]
pub struct Role {
    name: String,
    arn: String,
    policies: Mutex<Vec<Arc<Policy>>>,
}

impl Role {
    /// Create role
    #[must_use]
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            policies: Mutex::new(Vec::new()),
        }
    }

    /// Role name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role ARN
    #[inline]
    #[must_use]
    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Attach a policy; attaching the same policy object again has no effect
    ///
    /// Returns `true` if the policy was newly attached.
    pub fn attach_policy(&self, policy: Arc<Policy>) -> bool {
        let mut policies = self.policies.lock();
        if policies.iter().any(|p| Arc::ptr_eq(p, &policy)) {
            return false;
        }
        tracing::debug!(role = %self.name, policy = %policy.name(), "attaching policy");
        policies.push(policy);
        true
    }

    /// Attached policies, in attachment order
    #[must_use]
    pub fn attached_policies(&self) -> Vec<Arc<Policy>> {
        self.policies.lock().clone()
    }
}
