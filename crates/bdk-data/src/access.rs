//! Data access vocabulary
//!
//! Grants map to `appsync:GraphQL` on the operation types of the API plus
//! read access to the model introspection schema.

use bdk_platform::{AccessAction, AccessPolicyFactory, PolicyStatement};
use serde::{Deserialize, Serialize};

/// Key of the model introspection schema object
pub const MODEL_INTROSPECTION_SCHEMA_KEY: &str = "modelIntrospectionSchema.json";

/// API operation kind that can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataAction {
    /// Queries
    Query,
    /// Mutations
    Mutate,
    /// Subscriptions
    Listen,
}

impl DataAction {
    /// GraphQL operation type
    #[must_use]
    pub fn operation_type(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutate => "Mutation",
            Self::Listen => "Subscription",
        }
    }
}

impl AccessAction for DataAction {
    fn default_actions() -> Vec<Self> {
        vec![Self::Query, Self::Mutate, Self::Listen]
    }

    fn name(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutate => "mutate",
            Self::Listen => "listen",
        }
    }
}

/// Statements scoped to one API
#[derive(Debug, Clone)]
pub struct GraphqlAccessPolicyFactory {
    api_arn: String,
    model_introspection_schema_bucket_arn: String,
}

impl GraphqlAccessPolicyFactory {
    /// Create factory
    #[must_use]
    pub fn new(api_arn: impl Into<String>, model_introspection_schema_bucket_arn: impl Into<String>) -> Self {
        Self {
            api_arn: api_arn.into(),
            model_introspection_schema_bucket_arn: model_introspection_schema_bucket_arn.into(),
        }
    }
}

impl AccessPolicyFactory<DataAction> for GraphqlAccessPolicyFactory {
    fn statements_for(&self, action: DataAction) -> Vec<PolicyStatement> {
        vec![
            PolicyStatement::allow(
                ["appsync:GraphQL"],
                [format!("{}/types/{}/*", self.api_arn, action.operation_type())],
            ),
            PolicyStatement::allow(
                ["s3:GetObject"],
                [format!(
                    "{}/{MODEL_INTROSPECTION_SCHEMA_KEY}",
                    self.model_introspection_schema_bucket_arn
                )],
            ),
        ]
    }
}
