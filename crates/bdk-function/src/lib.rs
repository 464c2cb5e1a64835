//! BDK Function - functions as backend resources
//!
//! [`define_function`] returns a factory resolving to one [`BackendFunction`]
//! per backend. Functions:
//! - default their name to the entry stem or the definition directory
//! - validate timeout, memory, storage, environment keys, runtime,
//!   architecture and schedules when first requested
//! - accept access policies on their execution role and read granted
//!   parameters through `AMPLIFY_SSM_ENV_CONFIG`

#![warn(unreachable_pub)]

pub mod factory;
pub mod props;
pub mod resolve;
pub mod schedule;

pub use factory::{
    define_function, BackendFunction, FunctionFactory, DEFINED_FUNCTIONS_FIELD, LAMBDA_FUNCTION_TYPE,
    RUNTIME_RESOLVED_PLACEHOLDER, SSM_ENV_CONFIG_KEY,
};
pub use props::{Architecture, EnvironmentValue, FunctionLogging, FunctionProps};
pub use resolve::{resolve_function_props, ResolvedFunctionProps, SUPPORTED_RUNTIMES};
pub use schedule::to_cron_expression;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining functions
    pub use crate::{define_function, FunctionProps};
    pub use bdk_platform::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
