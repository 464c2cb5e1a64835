//! BDK Data - the GraphQL API of a backend
//!
//! [`define_data`] returns the singleton data factory of a backend. Its
//! instance creates the API with one table per model, wires schema
//! functions as Lambda data sources, settles authorization modes against
//! the backend's auth resource and grants API operations to other
//! resources.
//!
//! # Example
//!
//! ```rust,ignore
//! use bdk_data::prelude::*;
//!
//! let session = BuildSession::new();
//! let data = define_data(
//!     &session,
//!     DataProps::new("type Todo @model { content: String }")
//!         .with_logging(DataLogging::default()),
//! )?;
//! ```

#![warn(unreachable_pub)]

pub mod access;
pub mod construct;
pub mod factory;
pub mod props;
pub mod schema;
pub mod translate;

pub use access::{DataAction, GraphqlAccessPolicyFactory, MODEL_INTROSPECTION_SCHEMA_KEY};
pub use construct::{
    DataConstruct, DataConstructProps, DataResources, ModelTable, ResolvedAuthorizationModes, ResolvedDataLogging,
    DATA_SOURCE_TYPE, GRAPHQL_API_TYPE, IMPORTED_TABLE_TYPE, TABLE_TYPE,
};
pub use factory::{define_data, BackendData, DataFactory, DATA_SINGLETON, DEFAULT_DATA_NAME};
pub use props::{
    ApiKeyAuthorizationMode, AuthorizationModeKind, AuthorizationModes, DataLogging, DataProps, FieldLogLevel,
    LambdaAuthorizationMode, OidcAuthorizationMode, TableMapping,
};
pub use translate::DATA_CONFIGURATION_ERROR;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining data
    pub use crate::{define_data, AuthorizationModeKind, AuthorizationModes, DataAction, DataLogging, DataProps};
    pub use bdk_platform::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
