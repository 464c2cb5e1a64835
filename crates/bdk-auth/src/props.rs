//! User-facing auth configuration
//!
//! [`AuthProps`] is what `define_auth` takes: how users log in, MFA,
//! message senders, user groups, lifecycle triggers and access grants.

use crate::access::AuthAction;
use bdk_platform::{AccessGenerator, BackendSecret, FunctionHandlerFactory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Message template; called with the placeholder the service substitutes
#[derive(Clone)]
pub struct MessageTemplate(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl MessageTemplate {
    /// Wrap a template function
    pub fn new<F>(template: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(template))
    }

    /// Render with a placeholder
    #[must_use]
    pub fn render(&self, placeholder: &str) -> String {
        (self.0)(placeholder)
    }
}

impl fmt::Debug for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageTemplate(..)")
    }
}

/// How verification emails prove ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationEmailStyle {
    /// One-time code
    #[default]
    Code,
    /// Clickable link
    Link,
}

/// Email login settings; the default is plain email login
#[derive(Debug, Clone, Default)]
pub struct EmailLoginSettings {
    /// Code or link verification
    pub verification_email_style: VerificationEmailStyle,
    /// Subject of the verification email
    pub verification_email_subject: Option<String>,
    /// Body of the verification email
    pub verification_email_body: Option<MessageTemplate>,
}

/// Phone login settings; the default is plain phone login
#[derive(Debug, Clone, Default)]
pub struct PhoneLoginSettings {
    /// Verification SMS
    pub verification_message: Option<MessageTemplate>,
}

/// OAuth client credentials of a social provider
#[derive(Debug, Clone)]
pub struct SocialProvider {
    /// Client id
    pub client_id: BackendSecret,
    /// Client secret
    pub client_secret: BackendSecret,
    /// Requested scopes
    pub scopes: Vec<String>,
}

/// Sign in with Apple credentials
#[derive(Debug, Clone)]
pub struct AppleProvider {
    /// Services id
    pub client_id: BackendSecret,
    /// Key id
    pub key_id: BackendSecret,
    /// Private key
    pub private_key: BackendSecret,
    /// Team id
    pub team_id: BackendSecret,
}

/// OpenID Connect provider
#[derive(Debug, Clone)]
pub struct OidcProvider {
    /// Provider name
    pub name: String,
    /// Client id
    pub client_id: BackendSecret,
    /// Client secret
    pub client_secret: BackendSecret,
    /// Issuer URL
    pub issuer_url: String,
}

/// SAML provider
#[derive(Debug, Clone)]
pub struct SamlProvider {
    /// Provider name
    pub name: String,
    /// Metadata document or URL
    pub metadata_content: String,
}

/// Federated login providers
#[derive(Debug, Clone, Default)]
pub struct ExternalProviders {
    /// Google
    pub google: Option<SocialProvider>,
    /// Facebook
    pub facebook: Option<SocialProvider>,
    /// Login with Amazon
    pub login_with_amazon: Option<SocialProvider>,
    /// Sign in with Apple
    pub sign_in_with_apple: Option<AppleProvider>,
    /// OpenID Connect providers
    pub oidc: Vec<OidcProvider>,
    /// SAML provider
    pub saml: Option<SamlProvider>,
    /// Redirect targets after sign in
    pub callback_urls: Vec<String>,
    /// Redirect targets after sign out
    pub logout_urls: Vec<String>,
    /// OAuth scopes
    pub scopes: Vec<String>,
}

impl ExternalProviders {
    /// Check if any provider is configured
    #[must_use]
    pub fn has_providers(&self) -> bool {
        self.google.is_some()
            || self.facebook.is_some()
            || self.login_with_amazon.is_some()
            || self.sign_in_with_apple.is_some()
            || !self.oidc.is_empty()
            || self.saml.is_some()
    }
}

/// How users log in
#[derive(Debug, Clone, Default)]
pub struct LoginWith {
    /// Email login
    pub email: Option<EmailLoginSettings>,
    /// Phone login
    pub phone: Option<PhoneLoginSettings>,
    /// Federated login
    pub external_providers: Option<ExternalProviders>,
}

impl LoginWith {
    /// Plain email login
    #[must_use]
    pub fn email() -> Self {
        Self {
            email: Some(EmailLoginSettings::default()),
            ..Self::default()
        }
    }

    /// Plain phone login
    #[must_use]
    pub fn phone() -> Self {
        Self {
            phone: Some(PhoneLoginSettings::default()),
            ..Self::default()
        }
    }

    /// Set email settings
    #[inline]
    #[must_use]
    pub fn with_email(mut self, settings: EmailLoginSettings) -> Self {
        self.email = Some(settings);
        self
    }

    /// Set phone settings
    #[inline]
    #[must_use]
    pub fn with_phone(mut self, settings: PhoneLoginSettings) -> Self {
        self.phone = Some(settings);
        self
    }

    /// Set external providers
    #[inline]
    #[must_use]
    pub fn with_external_providers(mut self, providers: ExternalProviders) -> Self {
        self.external_providers = Some(providers);
        self
    }
}

/// MFA enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MfaMode {
    /// Disabled
    #[default]
    Off,
    /// Users may opt in
    Optional,
    /// Every user
    Required,
}

/// SMS MFA settings
#[derive(Debug, Clone, Default)]
pub struct SmsMfa {
    /// Authentication SMS
    pub sms_message: Option<MessageTemplate>,
}

/// Multi-factor authentication
#[derive(Debug, Clone, Default)]
pub struct MultiFactor {
    /// Enforcement
    pub mode: MfaMode,
    /// SMS factor
    pub sms: Option<SmsMfa>,
    /// Authenticator app factor
    pub totp: bool,
}

/// Custom sender function and the key codes are encrypted with
#[derive(Clone)]
pub struct CustomSender {
    /// Sender function
    pub handler: Arc<dyn FunctionHandlerFactory>,
    /// Encryption key
    pub kms_key_arn: Option<String>,
}

impl fmt::Debug for CustomSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomSender")
            .field("kms_key_arn", &self.kms_key_arn)
            .finish_non_exhaustive()
    }
}

/// SES sender identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SesEmailSender {
    /// Sender address
    pub from_email: String,
    /// Sender display name
    pub from_name: Option<String>,
    /// Reply-to address
    pub reply_to: Option<String>,
}

/// Email sender
#[derive(Debug, Clone)]
pub enum EmailSender {
    /// Send through SES
    Ses(SesEmailSender),
    /// Send through a custom function
    Custom(CustomSender),
}

/// SNS sender settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnsSmsSender {
    /// External id in the caller role trust policy
    pub external_id: Option<String>,
    /// Role SNS is called with
    pub sns_caller_arn: Option<String>,
    /// SNS region
    pub sns_region: Option<String>,
}

/// SMS sender
#[derive(Debug, Clone)]
pub enum SmsSender {
    /// Send through SNS
    Sns(SnsSmsSender),
    /// Send through a custom function
    Custom(CustomSender),
}

/// Message senders
#[derive(Debug, Clone, Default)]
pub struct Senders {
    /// Email sender
    pub email: Option<EmailSender>,
    /// SMS sender
    pub sms: Option<SmsSender>,
}

/// User pool lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerEvent {
    /// Custom auth challenge creation
    CreateAuthChallenge,
    /// Message customisation
    CustomMessage,
    /// Custom auth challenge definition
    DefineAuthChallenge,
    /// After authentication
    PostAuthentication,
    /// After sign-up confirmation
    PostConfirmation,
    /// Before authentication
    PreAuthentication,
    /// Before sign-up
    PreSignUp,
    /// Before token generation
    PreTokenGeneration,
    /// Just-in-time user migration
    UserMigration,
    /// Custom auth challenge verification
    VerifyAuthChallengeResponse,
}

impl TriggerEvent {
    /// Event name as used by the user pool
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAuthChallenge => "createAuthChallenge",
            Self::CustomMessage => "customMessage",
            Self::DefineAuthChallenge => "defineAuthChallenge",
            Self::PostAuthentication => "postAuthentication",
            Self::PostConfirmation => "postConfirmation",
            Self::PreAuthentication => "preAuthentication",
            Self::PreSignUp => "preSignUp",
            Self::PreTokenGeneration => "preTokenGeneration",
            Self::UserMigration => "userMigration",
            Self::VerifyAuthChallengeResponse => "verifyAuthChallengeResponse",
        }
    }
}

/// Configuration passed to `define_auth`
#[derive(Clone)]
pub struct AuthProps {
    /// Resource name; defaults to `amplifyAuth`
    pub name: Option<String>,
    /// Login methods
    pub login_with: LoginWith,
    /// Multi-factor authentication
    pub multifactor: Option<MultiFactor>,
    /// Message senders
    pub senders: Senders,
    /// User pool groups
    pub groups: Vec<String>,
    /// Lifecycle triggers
    pub triggers: BTreeMap<TriggerEvent, Arc<dyn FunctionHandlerFactory>>,
    /// Access grants to other resources
    pub access: Option<AccessGenerator<AuthAction>>,
}

impl fmt::Debug for AuthProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthProps")
            .field("name", &self.name)
            .field("login_with", &self.login_with)
            .field("multifactor", &self.multifactor)
            .field("senders", &self.senders)
            .field("groups", &self.groups)
            .field("triggers", &self.triggers.keys().collect::<Vec<_>>())
            .field("access", &self.access.is_some())
            .finish()
    }
}

impl AuthProps {
    /// Props with the given login methods
    #[must_use]
    pub fn new(login_with: LoginWith) -> Self {
        Self {
            name: None,
            login_with,
            multifactor: None,
            senders: Senders::default(),
            groups: Vec::new(),
            triggers: BTreeMap::new(),
            access: None,
        }
    }

    /// Plain email login
    #[inline]
    #[must_use]
    pub fn email() -> Self {
        Self::new(LoginWith::email())
    }

    /// Set resource name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set MFA
    #[inline]
    #[must_use]
    pub fn with_multifactor(mut self, multifactor: MultiFactor) -> Self {
        self.multifactor = Some(multifactor);
        self
    }

    /// Set senders
    #[inline]
    #[must_use]
    pub fn with_senders(mut self, senders: Senders) -> Self {
        self.senders = senders;
        self
    }

    /// Set user pool groups
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Add a lifecycle trigger
    #[must_use]
    pub fn with_trigger(mut self, event: TriggerEvent, handler: Arc<dyn FunctionHandlerFactory>) -> Self {
        self.triggers.insert(event, handler);
        self
    }

    /// Set access grants
    #[inline]
    #[must_use]
    pub fn with_access(mut self, access: AccessGenerator<AuthAction>) -> Self {
        self.access = Some(access);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdk_platform::secret;

    #[test]
    fn external_providers_detection() {
        let mut providers = ExternalProviders::default();
        assert!(!providers.has_providers());
        providers.google = Some(SocialProvider {
            client_id: secret("GOOGLE_CLIENT_ID"),
            client_secret: secret("GOOGLE_CLIENT_SECRET"),
            scopes: vec![],
        });
        assert!(providers.has_providers());
    }

    #[test]
    fn trigger_event_names() {
        assert_eq!(TriggerEvent::PreSignUp.as_str(), "preSignUp");
        assert_eq!(
            serde_json::to_string(&TriggerEvent::PostConfirmation).unwrap(),
            "\"postConfirmation\""
        );
    }

    #[test]
    fn template_renders_placeholder() {
        let template = MessageTemplate::new(|code| format!("Your code is {code}"));
        assert_eq!(template.render("{####}"), "Your code is {####}");
    }
}
