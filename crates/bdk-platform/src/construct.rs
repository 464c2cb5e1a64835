//! Construct scope model
//!
//! - [`Stack`]: deployment unit that owns resources of one resource group
//! - [`Tags`]: key/value tags applied to a construct
//! - [`StackResolver`]: creates one nested stack per resource group on first use

use crate::error::ConstructError;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tag key carrying the user-facing resource name
pub const FRIENDLY_NAME_TAG_KEY: &str = "amplify:friendly-name";

/// Resource group names
pub mod resource_group {
    /// Auth resources
    pub const AUTH: &str = "auth";
    /// Data resources
    pub const DATA: &str = "data";
    /// Function resources
    pub const FUNCTION: &str = "function";
}

/// Construct tags
#[derive(Debug, Default)]
pub struct Tags {
    values: RwLock<BTreeMap<String, String>>,
}

impl Tags {
    /// Create empty tag set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag, replacing previous value
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Tag value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Snapshot of all tags
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }

    /// Friendly-name tag, if set
    #[inline]
    #[must_use]
    pub fn friendly_name(&self) -> Option<String> {
        self.get(FRIENDLY_NAME_TAG_KEY)
    }

    /// Apply the friendly-name tag
    #[inline]
    pub fn set_friendly_name(&self, name: &str) {
        self.add(FRIENDLY_NAME_TAG_KEY, name);
    }
}

/// Resource registered in a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    /// Logical id within the stack
    pub logical_id: String,
    /// Resource type, e.g. `AWS::Cognito::UserPool`
    pub resource_type: String,
}

/// Deployment unit
#[derive(Debug)]
pub struct Stack {
    name: String,
    region: String,
    account: String,
    resources: RwLock<Vec<StackResource>>,
}

impl Stack {
    /// Create stack
    #[must_use]
    pub fn new(name: impl Into<String>, region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            account: account.into(),
            resources: RwLock::new(Vec::new()),
        }
    }

    /// Stack name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deployment region
    #[inline]
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Deployment account
    #[inline]
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Build an ARN for a resource in this stack's region and account
    ///
    /// IAM is global and gets no region segment.
    #[must_use]
    pub fn format_arn(&self, service: &str, resource: &str) -> String {
        let region = if service == "iam" { "" } else { self.region.as_str() };
        format!("arn:aws:{service}:{region}:{}:{resource}", self.account)
    }

    /// Register a resource
    ///
    /// # Errors
    ///
    /// [`ConstructError::DuplicateLogicalId`] if the stack already holds a
    /// resource with this logical id.
    pub fn add_resource(
        &self,
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Result<(), ConstructError> {
        let logical_id = logical_id.into();
        let mut resources = self.resources.write();
        if resources.iter().any(|r| r.logical_id == logical_id) {
            return Err(ConstructError::DuplicateLogicalId {
                logical_id,
                stack: self.name.clone(),
            });
        }
        resources.push(StackResource {
            logical_id,
            resource_type: resource_type.into(),
        });
        Ok(())
    }

    /// Resources of the given type
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<StackResource> {
        self.resources
            .read()
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect()
    }

    /// Number of registered resources
    #[inline]
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.read().len()
    }
}

/// Creates nested stacks per resource group
#[derive(Debug)]
pub struct StackResolver {
    root_stack_name: String,
    region: String,
    account: String,
    stacks: DashMap<String, Arc<Stack>>,
}

impl StackResolver {
    /// Create resolver for a root stack
    #[must_use]
    pub fn new(root_stack_name: impl Into<String>, region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            root_stack_name: root_stack_name.into(),
            region: region.into(),
            account: account.into(),
            stacks: DashMap::new(),
        }
    }

    /// Stack for a resource group, created on first request
    #[must_use]
    pub fn get_stack_for(&self, resource_group_name: &str) -> Arc<Stack> {
        self.stacks
            .entry(resource_group_name.to_string())
            .or_insert_with(|| {
                tracing::debug!(resource_group = resource_group_name, "creating nested stack");
                Arc::new(Stack::new(
                    format!("{}-{resource_group_name}", self.root_stack_name),
                    self.region.clone(),
                    self.account.clone(),
                ))
            })
            .clone()
    }

    /// Number of created stacks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Check if no stack was created yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
