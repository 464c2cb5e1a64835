//! BDK Auth - user pool backed authentication
//!
//! [`define_auth`] returns the singleton auth factory of a backend. Its
//! instance exposes the user pool, identity pool and IAM roles, grants
//! user pool operations to other resources and accepts access policies on
//! the authenticated, unauthenticated and group roles.
//!
//! # Example
//!
//! ```rust,ignore
//! use bdk_auth::prelude::*;
//!
//! let session = BuildSession::new();
//! let auth = define_auth(
//!     &session,
//!     AuthProps::email().with_access(access(|allow| {
//!         vec![allow.resource(admin_function.clone()).to([AuthAction::CreateUser])]
//!     })),
//! )?;
//! ```

#![warn(unreachable_pub)]

pub mod access;
pub mod construct;
pub mod factory;
pub mod props;
pub mod translate;

pub use access::{AuthAction, UserPoolAccessPolicyFactory};
pub use construct::{AuthConstruct, AuthConstructProps, CODE_PLACEHOLDER, LINK_PLACEHOLDER};
pub use factory::{define_auth, AuthFactory, BackendAuth, AUTH_SINGLETON, DEFAULT_AUTH_NAME};
pub use props::{
    AppleProvider, AuthProps, CustomSender, EmailLoginSettings, EmailSender, ExternalProviders, LoginWith,
    MessageTemplate, MfaMode, MultiFactor, OidcProvider, PhoneLoginSettings, SamlProvider, Senders,
    SesEmailSender, SmsMfa, SmsSender, SnsSmsSender, SocialProvider, TriggerEvent, VerificationEmailStyle,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for defining auth
    pub use crate::{define_auth, AuthAction, AuthProps, LoginWith, MultiFactor, TriggerEvent};
    pub use bdk_platform::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
