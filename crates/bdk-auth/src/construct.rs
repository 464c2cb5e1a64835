//! Auth construct model
//!
//! [`AuthConstruct`] stands in for the user pool / identity pool
//! infrastructure construct. It takes fully resolved props, rejects
//! inconsistent configuration with the messages users see, registers its
//! resources in the owning stack and computes the auth backend output.

use crate::props::{EmailLoginSettings, MfaMode, MultiFactor, PhoneLoginSettings, SesEmailSender, SnsSmsSender, VerificationEmailStyle};
use bdk_platform::{
    AuthResources, BackendOutputEntry, ConstructError, LambdaFunction, Role, SecretValue, Stack, Tags, UserPool,
    UserPoolGroup,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Placeholder substituted with the verification code
pub const CODE_PLACEHOLDER: &str = "{####}";
/// Placeholder substituted with the verification link
pub const LINK_PLACEHOLDER: &str = "{##Verify Email##}";

/// User pool resource type
pub const USER_POOL_TYPE: &str = "AWS::Cognito::UserPool";

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{##[\s\S]*##\}").expect("link placeholder regex is valid"));

/// External provider with secrets resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    /// Provider type, e.g. `Google`
    pub provider_type: String,
    /// Provider name as shown in the hosted UI
    pub provider_name: String,
    /// Resolved credential tokens by attribute
    pub credentials: BTreeMap<String, SecretValue>,
}

/// Federation settings with secrets resolved and domain prefix assigned
#[derive(Debug, Clone, Default)]
pub struct ResolvedExternalProviders {
    /// Providers
    pub providers: Vec<ResolvedProvider>,
    /// Redirect targets after sign in
    pub callback_urls: Vec<String>,
    /// Redirect targets after sign out
    pub logout_urls: Vec<String>,
    /// OAuth scopes
    pub scopes: Vec<String>,
    /// Hosted UI domain prefix
    pub domain_prefix: Option<String>,
}

/// Login settings accepted by the construct
#[derive(Debug, Clone, Default)]
pub struct ConstructLoginWith {
    /// Email login
    pub email: Option<EmailLoginSettings>,
    /// Phone login
    pub phone: Option<PhoneLoginSettings>,
    /// Federated login
    pub external_providers: Option<ResolvedExternalProviders>,
}

/// Custom sender with its function resolved
#[derive(Debug, Clone)]
pub struct ResolvedCustomSender {
    /// Sender function
    pub handler: Arc<LambdaFunction>,
    /// Encryption key
    pub kms_key_arn: Option<String>,
}

/// Resolved email sender
#[derive(Debug, Clone)]
pub enum ConstructEmailSender {
    /// SES identity
    Ses(SesEmailSender),
    /// Custom function
    Custom(ResolvedCustomSender),
}

/// Resolved SMS sender
#[derive(Debug, Clone)]
pub enum ConstructSmsSender {
    /// SNS settings
    Sns(SnsSmsSender),
    /// Custom function
    Custom(ResolvedCustomSender),
}

/// Construct input
#[derive(Debug, Clone, Default)]
pub struct AuthConstructProps {
    /// Login methods
    pub login_with: ConstructLoginWith,
    /// MFA
    pub multifactor: Option<MultiFactor>,
    /// Email sender
    pub email_sender: Option<ConstructEmailSender>,
    /// SMS sender
    pub sms_sender: Option<ConstructSmsSender>,
    /// User pool groups
    pub groups: Vec<String>,
    /// Suffix making physical ids unique
    pub physical_id_suffix: String,
}

/// Instantiated auth construct
#[derive(Debug)]
pub struct AuthConstruct {
    id: String,
    resources: AuthResources,
    tags: Tags,
    output: BackendOutputEntry,
}

impl AuthConstruct {
    /// Validate props and create the auth resources in `scope`
    ///
    /// # Errors
    ///
    /// [`ConstructError::InvalidProps`] describing the first inconsistency,
    /// [`ConstructError::DuplicateLogicalId`] if `scope` already holds auth
    /// resources under `id`.
    pub fn new(scope: &Stack, id: &str, props: AuthConstructProps) -> Result<Self, ConstructError> {
        validate(&props)?;

        let suffix: String = props.physical_id_suffix.chars().take(9).collect();
        let user_pool_id = format!("{}_{suffix}", scope.region());
        let user_pool = Arc::new(UserPool::new(
            user_pool_id.clone(),
            scope.format_arn("cognito-idp", &format!("userpool/{user_pool_id}")),
        ));
        scope.add_resource(format!("{id}UserPool"), USER_POOL_TYPE)?;
        scope.add_resource(format!("{id}UserPoolAppClient"), "AWS::Cognito::UserPoolClient")?;
        scope.add_resource(format!("{id}IdentityPool"), "AWS::Cognito::IdentityPool")?;

        let role = |name: String| -> Result<Arc<Role>, ConstructError> {
            scope.add_resource(name.clone(), "AWS::IAM::Role")?;
            let arn = scope.format_arn("iam", &format!("role/{name}"));
            Ok(Arc::new(Role::new(name, arn)))
        };
        let authenticated_user_iam_role = role(format!("{id}AuthenticatedUserRole"))?;
        let unauthenticated_user_iam_role = role(format!("{id}UnauthenticatedUserRole"))?;

        let mut groups = BTreeMap::new();
        for (precedence, group) in (0u32..).zip(&props.groups) {
            scope.add_resource(format!("{id}{group}Group"), "AWS::Cognito::UserPoolGroup")?;
            groups.insert(
                group.clone(),
                UserPoolGroup {
                    name: group.clone(),
                    role: role(format!("{id}{group}GroupRole"))?,
                    precedence: Some(precedence),
                },
            );
        }

        if let Some(external) = &props.login_with.external_providers {
            for provider in &external.providers {
                scope.add_resource(
                    format!("{id}{}IdP", provider.provider_name),
                    "AWS::Cognito::UserPoolIdentityProvider",
                )?;
            }
            if external.domain_prefix.is_some() {
                scope.add_resource(format!("{id}UserPoolDomain"), "AWS::Cognito::UserPoolDomain")?;
            }
        }

        if let Some(ConstructEmailSender::Custom(sender)) = &props.email_sender {
            user_pool.add_trigger("customEmailSender", Arc::clone(&sender.handler))?;
            if let Some(arn) = &sender.kms_key_arn {
                user_pool.set_kms_key_arn(arn.clone());
            }
        }
        if let Some(ConstructSmsSender::Custom(sender)) = &props.sms_sender {
            user_pool.add_trigger("customSmsSender", Arc::clone(&sender.handler))?;
            if let Some(arn) = &sender.kms_key_arn {
                user_pool.set_kms_key_arn(arn.clone());
            }
        }

        let resources = AuthResources {
            user_pool,
            user_pool_client_id: format!("{suffix}client"),
            identity_pool_id: format!("{}:{suffix}", scope.region()),
            authenticated_user_iam_role,
            unauthenticated_user_iam_role,
            groups,
        };
        let output = output_entry(scope, &resources, &props);

        Ok(Self {
            id: id.to_string(),
            resources,
            tags: Tags::new(),
            output,
        })
    }

    /// Construct id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resource handles
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &AuthResources {
        &self.resources
    }

    /// Construct tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Auth backend output
    #[inline]
    #[must_use]
    pub fn output(&self) -> &BackendOutputEntry {
        &self.output
    }
}

fn validate(props: &AuthConstructProps) -> Result<(), ConstructError> {
    let login = &props.login_with;
    if login.email.is_none() && login.phone.is_none() {
        return Err(ConstructError::invalid("At least one of email or phone must be enabled."));
    }

    if let Some(email) = &login.email {
        validate_email(email)?;
    }

    if let Some(template) = login.phone.as_ref().and_then(|p| p.verification_message.as_ref()) {
        if !template.render(CODE_PLACEHOLDER).contains(CODE_PLACEHOLDER) {
            return Err(ConstructError::invalid(
                "Invalid phone settings. Property 'verificationMessage' must utilize the 'code' parameter at least once as a placeholder for the verification code.",
            ));
        }
    }

    if let Some(mfa) = &props.multifactor {
        validate_mfa(mfa, login.phone.is_some())?;
    }

    if let Some(ConstructSmsSender::Sns(sns)) = &props.sms_sender {
        if sns.external_id.is_some() != sns.sns_caller_arn.is_some() {
            return Err(ConstructError::invalid(
                "Both externalId and snsCallerArn are required when providing a custom IAM role. Ensure that your IAM role trust policy have an sts:ExternalId condition and is equal to the externalId value",
            ));
        }
    }

    if let (Some(ConstructEmailSender::Custom(email)), Some(ConstructSmsSender::Custom(sms))) =
        (&props.email_sender, &props.sms_sender)
    {
        if let (Some(email_key), Some(sms_key)) = (&email.kms_key_arn, &sms.kms_key_arn) {
            if email_key != sms_key {
                return Err(ConstructError::invalid(
                    "KMS key ARN must be the same for both email and sms senders",
                ));
            }
        }
    }

    if let Some(external) = &login.external_providers {
        if !external.providers.is_empty() {
            if external.callback_urls.is_empty() {
                return Err(ConstructError::invalid(
                    "You must define callbackUrls when configuring external login providers.",
                ));
            }
            if external.domain_prefix.is_none() {
                return Err(ConstructError::invalid(
                    "Cognito Domain Prefix is missing when external providers are configured.",
                ));
            }
            if external.logout_urls.is_empty() {
                return Err(ConstructError::invalid(
                    "You must define logoutUrls when configuring external login providers.",
                ));
            }
        }
    }

    Ok(())
}

fn validate_email(email: &EmailLoginSettings) -> Result<(), ConstructError> {
    let Some(body) = &email.verification_email_body else {
        return Ok(());
    };
    match email.verification_email_style {
        VerificationEmailStyle::Code => {
            if !body.render(CODE_PLACEHOLDER).contains(CODE_PLACEHOLDER) {
                return Err(ConstructError::invalid(
                    "Invalid email settings. Property 'verificationEmailBody' must utilize the 'code' parameter at least once as a placeholder for the verification code.",
                ));
            }
        }
        VerificationEmailStyle::Link => {
            if !LINK_PATTERN.is_match(&body.render(LINK_PLACEHOLDER)) {
                return Err(ConstructError::invalid(
                    "Invalid email settings. Property 'verificationEmailBody' must utilize the 'link' parameter at least once as a placeholder for the verification link.",
                ));
            }
        }
    }
    Ok(())
}

fn validate_mfa(mfa: &MultiFactor, phone_login: bool) -> Result<(), ConstructError> {
    if mfa.mode == MfaMode::Off {
        return Ok(());
    }
    if phone_login && mfa.sms.is_none() {
        return Err(ConstructError::invalid(
            "Invalid MFA settings. SMS must be enabled in multiFactor if loginWith phone is enabled",
        ));
    }
    if let Some(template) = mfa.sms.as_ref().and_then(|sms| sms.sms_message.as_ref()) {
        if !template.render(CODE_PLACEHOLDER).contains(CODE_PLACEHOLDER) {
            return Err(ConstructError::invalid(
                "Invalid MFA settings. Property 'smsMessage' must utilize the 'code' parameter at least once as a placeholder for the verification code.",
            ));
        }
    }
    Ok(())
}

fn json_list<S: AsRef<str>>(values: &[S]) -> String {
    serde_json::Value::from(values.iter().map(|v| v.as_ref().to_string()).collect::<Vec<_>>()).to_string()
}

fn output_entry(scope: &Stack, resources: &AuthResources, props: &AuthConstructProps) -> BackendOutputEntry {
    let login = &props.login_with;
    let mut username_attributes = Vec::new();
    if login.email.is_some() {
        username_attributes.push("email");
    }
    if login.phone.is_some() {
        username_attributes.push("phone_number");
    }

    let mut entry = BackendOutputEntry::new("1")
        .with_field("userPoolId", resources.user_pool.user_pool_id())
        .with_field("webClientId", resources.user_pool_client_id.as_str())
        .with_field("identityPoolId", resources.identity_pool_id.as_str())
        .with_field("authRegion", scope.region())
        .with_field("usernameAttributes", json_list(&username_attributes))
        .with_field("signupAttributes", json_list(&username_attributes))
        .with_field("verificationMechanisms", json_list(&username_attributes))
        .with_field("passwordPolicyMinLength", "8")
        .with_field("allowUnauthenticatedIdentities", "true");

    let mfa = props.multifactor.as_ref().filter(|m| m.mode != MfaMode::Off);
    let mfa_configuration = match mfa.map(|m| m.mode) {
        None | Some(MfaMode::Off) => "OFF",
        Some(MfaMode::Optional) => "OPTIONAL",
        Some(MfaMode::Required) => "ON",
    };
    entry = entry.with_field("mfaConfiguration", mfa_configuration);
    if let Some(mfa) = mfa {
        let mut types = Vec::new();
        if mfa.sms.is_some() {
            types.push("SMS");
        }
        if mfa.totp {
            types.push("TOTP");
        }
        entry = entry.with_field("mfaTypes", json_list(&types));
    }

    if !resources.groups.is_empty() {
        let names: Vec<&str> = resources.groups.keys().map(String::as_str).collect();
        entry = entry.with_field("groups", json_list(&names));
    }

    if let Some(external) = &login.external_providers {
        let providers: Vec<String> = external
            .providers
            .iter()
            .map(|p| p.provider_type.to_uppercase())
            .collect();
        entry = entry
            .with_field("socialProviders", json_list(&providers))
            .with_field("oauthScope", json_list(&external.scopes))
            .with_field("oauthRedirectSignIn", external.callback_urls.join(","))
            .with_field("oauthRedirectSignOut", external.logout_urls.join(","))
            .with_field("oauthResponseType", "code");
        if let Some(prefix) = &external.domain_prefix {
            entry = entry.with_field(
                "oauthCognitoDomain",
                format!("{prefix}.auth.{}.amazoncognito.com", scope.region()),
            );
        }
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{MessageTemplate, SmsMfa};
    use pretty_assertions::assert_eq;

    fn stack() -> Stack {
        Stack::new("root-auth", "us-east-1", "123456789012")
    }

    fn email_props() -> AuthConstructProps {
        AuthConstructProps {
            login_with: ConstructLoginWith {
                email: Some(EmailLoginSettings::default()),
                ..ConstructLoginWith::default()
            },
            physical_id_suffix: "abcdef0123456789".into(),
            ..AuthConstructProps::default()
        }
    }

    fn message(err: ConstructError) -> String {
        err.to_string()
    }

    fn lambda(name: &str) -> Arc<LambdaFunction> {
        Arc::new(LambdaFunction::new(name, format!("arn:{name}"), Arc::new(Role::new("r", "arn:r"))))
    }

    #[test]
    fn email_login_creates_one_user_pool() {
        let scope = stack();
        let construct = AuthConstruct::new(&scope, "amplifyAuth", email_props()).unwrap();

        assert_eq!(scope.resources_of_type(USER_POOL_TYPE).len(), 1);
        let payload = &construct.output().payload;
        assert_eq!(payload["usernameAttributes"], r#"["email"]"#);
        assert_eq!(payload["verificationMechanisms"], r#"["email"]"#);
        assert_eq!(payload["mfaConfiguration"], "OFF");
        assert_eq!(construct.resources().user_pool.user_pool_id(), "us-east-1_abcdef012");
    }

    #[test]
    fn empty_login_is_rejected() {
        let err = AuthConstruct::new(&stack(), "a", AuthConstructProps::default()).unwrap_err();
        assert_eq!(message(err), "At least one of email or phone must be enabled.");
    }

    #[test]
    fn email_body_must_contain_code() {
        let mut props = email_props();
        props.login_with.email = Some(EmailLoginSettings {
            verification_email_body: Some(MessageTemplate::new(|_| "no code here".into())),
            ..EmailLoginSettings::default()
        });
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert!(message(err).contains("'verificationEmailBody' must utilize the 'code' parameter"));
    }

    #[test]
    fn link_body_accepts_custom_text() {
        let mut props = email_props();
        props.login_with.email = Some(EmailLoginSettings {
            verification_email_style: VerificationEmailStyle::Link,
            verification_email_body: Some(MessageTemplate::new(|_| "Click {##here##}".into())),
            ..EmailLoginSettings::default()
        });
        assert!(AuthConstruct::new(&stack(), "a", props).is_ok());
    }

    #[test]
    fn link_body_without_link_is_rejected() {
        let mut props = email_props();
        props.login_with.email = Some(EmailLoginSettings {
            verification_email_style: VerificationEmailStyle::Link,
            verification_email_body: Some(MessageTemplate::new(|_| "Click nothing".into())),
            ..EmailLoginSettings::default()
        });
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert!(message(err).contains("placeholder for the verification link."));
    }

    #[test]
    fn phone_login_with_mfa_requires_sms() {
        let mut props = email_props();
        props.login_with.phone = Some(PhoneLoginSettings::default());
        props.multifactor = Some(MultiFactor {
            mode: MfaMode::Required,
            sms: None,
            totp: true,
        });
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert_eq!(
            message(err),
            "Invalid MFA settings. SMS must be enabled in multiFactor if loginWith phone is enabled"
        );
    }

    #[test]
    fn mfa_outputs() {
        let mut props = email_props();
        props.multifactor = Some(MultiFactor {
            mode: MfaMode::Optional,
            sms: Some(SmsMfa::default()),
            totp: true,
        });
        let construct = AuthConstruct::new(&stack(), "a", props).unwrap();
        let payload = &construct.output().payload;
        assert_eq!(payload["mfaConfiguration"], "OPTIONAL");
        assert_eq!(payload["mfaTypes"], r#"["SMS","TOTP"]"#);
    }

    #[test]
    fn mismatched_kms_keys_are_rejected() {
        let mut props = email_props();
        props.email_sender = Some(ConstructEmailSender::Custom(ResolvedCustomSender {
            handler: lambda("email"),
            kms_key_arn: Some("arn:aws:kms:us-east-1:1:key/one".into()),
        }));
        props.sms_sender = Some(ConstructSmsSender::Custom(ResolvedCustomSender {
            handler: lambda("sms"),
            kms_key_arn: Some("arn:aws:kms:us-east-1:1:key/two".into()),
        }));
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert_eq!(
            message(err),
            "KMS key ARN must be the same for both email and sms senders"
        );
    }

    #[test]
    fn custom_senders_are_wired_as_triggers() {
        let mut props = email_props();
        let key = Some("arn:aws:kms:us-east-1:1:key/one".to_string());
        props.email_sender = Some(ConstructEmailSender::Custom(ResolvedCustomSender {
            handler: lambda("email"),
            kms_key_arn: key.clone(),
        }));
        props.sms_sender = Some(ConstructSmsSender::Custom(ResolvedCustomSender {
            handler: lambda("sms"),
            kms_key_arn: key.clone(),
        }));
        let construct = AuthConstruct::new(&stack(), "a", props).unwrap();
        let pool = &construct.resources().user_pool;
        assert_eq!(pool.trigger_events(), vec!["customEmailSender", "customSmsSender"]);
        assert_eq!(pool.kms_key_arn(), key);
    }

    #[test]
    fn sns_requires_external_id_and_caller_arn_together() {
        let mut props = email_props();
        props.sms_sender = Some(ConstructSmsSender::Sns(SnsSmsSender {
            external_id: Some("id".into()),
            sns_caller_arn: None,
            sns_region: None,
        }));
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert!(message(err).starts_with("Both externalId and snsCallerArn are required"));
    }

    #[test]
    fn external_providers_require_urls_and_domain() {
        let provider = ResolvedProvider {
            provider_type: "Google".into(),
            provider_name: "Google".into(),
            credentials: BTreeMap::new(),
        };
        let mut props = email_props();
        props.login_with.external_providers = Some(ResolvedExternalProviders {
            providers: vec![provider.clone()],
            ..ResolvedExternalProviders::default()
        });
        let err = AuthConstruct::new(&stack(), "a", props.clone()).unwrap_err();
        assert_eq!(
            message(err),
            "You must define callbackUrls when configuring external login providers."
        );

        props.login_with.external_providers = Some(ResolvedExternalProviders {
            providers: vec![provider.clone()],
            callback_urls: vec!["https://app/".into()],
            ..ResolvedExternalProviders::default()
        });
        let err = AuthConstruct::new(&stack(), "a", props.clone()).unwrap_err();
        assert_eq!(
            message(err),
            "Cognito Domain Prefix is missing when external providers are configured."
        );

        props.login_with.external_providers = Some(ResolvedExternalProviders {
            providers: vec![provider],
            callback_urls: vec!["https://app/".into()],
            domain_prefix: Some("abc".into()),
            ..ResolvedExternalProviders::default()
        });
        let err = AuthConstruct::new(&stack(), "a", props).unwrap_err();
        assert_eq!(
            message(err),
            "You must define logoutUrls when configuring external login providers."
        );
    }

    #[test]
    fn groups_get_roles() {
        let mut props = email_props();
        props.groups = vec!["ADMINS".into(), "EDITORS".into()];
        let construct = AuthConstruct::new(&stack(), "a", props).unwrap();
        let groups = &construct.resources().groups;
        assert_eq!(groups["ADMINS"].precedence, Some(0));
        assert_eq!(groups["EDITORS"].role.name(), "aEDITORSGroupRole");
        assert_eq!(construct.output().payload["groups"], r#"["ADMINS","EDITORS"]"#);
    }
}
