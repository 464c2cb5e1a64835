//! User-facing data configuration

use crate::access::DataAction;
use bdk_platform::{AccessGenerator, FunctionHandlerFactory, LogRetention};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Authorization mode of the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationModeKind {
    /// API key
    ApiKey,
    /// User pool tokens
    UserPool,
    /// Signed IAM requests
    Iam,
    /// OpenID Connect tokens
    Oidc,
    /// Lambda authorizer
    Lambda,
}

impl AuthorizationModeKind {
    /// Authentication type name used in outputs
    #[must_use]
    pub fn authentication_type(self) -> &'static str {
        match self {
            Self::ApiKey => "API_KEY",
            Self::UserPool => "AMAZON_COGNITO_USER_POOLS",
            Self::Iam => "AWS_IAM",
            Self::Oidc => "OPENID_CONNECT",
            Self::Lambda => "AWS_LAMBDA",
        }
    }
}

/// API key settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKeyAuthorizationMode {
    /// Days until the key expires
    pub expires_in_days: u32,
    /// Key description
    pub description: Option<String>,
}

impl Default for ApiKeyAuthorizationMode {
    fn default() -> Self {
        Self {
            expires_in_days: 7,
            description: None,
        }
    }
}

/// OpenID Connect settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcAuthorizationMode {
    /// Provider name
    pub oidc_provider_name: String,
    /// Issuer URL
    pub oidc_issuer_url: String,
    /// Client id
    pub client_id: Option<String>,
    /// Token lifetime after issue
    pub token_expire_from_issue_in_seconds: u32,
    /// Token lifetime after authentication
    pub token_expiry_from_auth_in_seconds: u32,
}

/// Lambda authorizer settings
#[derive(Clone)]
pub struct LambdaAuthorizationMode {
    /// Authorizer function
    pub function: Arc<dyn FunctionHandlerFactory>,
    /// Result cache lifetime
    pub time_to_live_in_seconds: u32,
}

impl fmt::Debug for LambdaAuthorizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaAuthorizationMode")
            .field("time_to_live_in_seconds", &self.time_to_live_in_seconds)
            .finish_non_exhaustive()
    }
}

/// Authorization modes of the API
#[derive(Debug, Clone, Default)]
pub struct AuthorizationModes {
    /// Mode used when a request does not name one
    pub default_authorization_mode: Option<AuthorizationModeKind>,
    /// API key mode
    pub api_key: Option<ApiKeyAuthorizationMode>,
    /// OIDC mode
    pub oidc: Option<OidcAuthorizationMode>,
    /// Lambda mode
    pub lambda: Option<LambdaAuthorizationMode>,
}

impl AuthorizationModes {
    /// Modes configured explicitly, in a fixed order
    #[must_use]
    pub fn configured(&self) -> Vec<AuthorizationModeKind> {
        let mut modes = Vec::new();
        if self.api_key.is_some() {
            modes.push(AuthorizationModeKind::ApiKey);
        }
        if self.oidc.is_some() {
            modes.push(AuthorizationModeKind::Oidc);
        }
        if self.lambda.is_some() {
            modes.push(AuthorizationModeKind::Lambda);
        }
        modes
    }
}

/// Resolver field log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum FieldLogLevel {
    #[default]
    None,
    Error,
    Info,
    Debug,
    All,
}

impl FieldLogLevel {
    /// Upper-case level name
    #[must_use]
    pub fn as_upper(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Error => "ERROR",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::All => "ALL",
        }
    }
}

/// API logging; `DataLogging::default()` enables logging with defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataLogging {
    /// Drop request and response bodies
    pub exclude_verbose_content: Option<bool>,
    /// Resolver field log level
    pub field_log_level: Option<FieldLogLevel>,
    /// Log group retention
    pub retention: Option<LogRetention>,
}

/// Table names of a previous deployment for one branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    /// Branch, or `sandbox`
    pub branch_name: String,
    /// Model name to existing table name
    pub model_name_to_table_name_mapping: Option<BTreeMap<String, String>>,
}

/// Configuration passed to `define_data`
#[derive(Clone, Default)]
pub struct DataProps {
    /// API name; defaults to `amplifyData`
    pub name: Option<String>,
    /// GraphQL schema
    pub schema: String,
    /// Authorization modes
    pub authorization_modes: Option<AuthorizationModes>,
    /// Functions referenced by the schema, by name
    pub functions: BTreeMap<String, Arc<dyn FunctionHandlerFactory>>,
    /// Logging
    pub logging: Option<DataLogging>,
    /// Tables to import instead of create
    pub migrated_table_mappings: Vec<TableMapping>,
    /// Access grants to other resources
    pub access: Option<AccessGenerator<DataAction>>,
}

impl fmt::Debug for DataProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProps")
            .field("name", &self.name)
            .field("schema_len", &self.schema.len())
            .field("authorization_modes", &self.authorization_modes)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("logging", &self.logging)
            .field("migrated_table_mappings", &self.migrated_table_mappings)
            .field("access", &self.access.is_some())
            .finish()
    }
}

impl DataProps {
    /// Props for a schema
    #[must_use]
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Set API name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set authorization modes
    #[must_use]
    pub fn with_authorization_modes(mut self, modes: AuthorizationModes) -> Self {
        self.authorization_modes = Some(modes);
        self
    }

    /// Add a schema function
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>, function: Arc<dyn FunctionHandlerFactory>) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Enable logging
    #[must_use]
    pub fn with_logging(mut self, logging: DataLogging) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Add a table mapping
    #[must_use]
    pub fn with_table_mapping(mut self, mapping: TableMapping) -> Self {
        self.migrated_table_mappings.push(mapping);
        self
    }

    /// Set access grants
    #[must_use]
    pub fn with_access(mut self, access: AccessGenerator<DataAction>) -> Self {
        self.access = Some(access);
        self
    }
}
