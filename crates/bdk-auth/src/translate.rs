//! Translation of user props into construct props
//!
//! Secrets become resolvable references, sender functions become deployed
//! function handles and federation gets its hosted UI domain prefix.

use crate::construct::{
    AuthConstructProps, ConstructEmailSender, ConstructLoginWith, ConstructSmsSender, ResolvedCustomSender,
    ResolvedExternalProviders, ResolvedProvider,
};
use crate::props::{AuthProps, CustomSender, EmailSender, ExternalProviders, SmsSender, SocialProvider};
use bdk_platform::{
    BackendSecret, BackendSecretResolver, ConstructFactoryGetInstanceProps, GenerateContainerEntryProps, Result,
    SecretValue,
};
use std::collections::BTreeMap;

/// Build construct props for the auth resource `name`
///
/// # Errors
///
/// Errors from resolving custom sender functions.
pub fn translate_auth_props(
    name: &str,
    props: &AuthProps,
    generate_props: &GenerateContainerEntryProps<'_>,
    get_instance_props: &ConstructFactoryGetInstanceProps,
) -> Result<AuthConstructProps> {
    let resolver = generate_props.backend_secret_resolver;
    let external_providers = props
        .login_with
        .external_providers
        .as_ref()
        .map(|external| {
            let mut resolved = translate_external_providers(external, resolver);
            if !resolved.providers.is_empty() {
                resolved.domain_prefix = Some(
                    generate_props
                        .stable_backend_identifiers
                        .get_stable_backend_hash()
                        .to_string(),
                );
            }
            resolved
        });

    let resolve_sender = |sender: &CustomSender| -> Result<ResolvedCustomSender> {
        let resources = sender.handler.resolve_function_resources(get_instance_props)?;
        Ok(ResolvedCustomSender {
            handler: resources.lambda,
            kms_key_arn: sender.kms_key_arn.clone(),
        })
    };

    let email_sender = match &props.senders.email {
        None => None,
        Some(EmailSender::Ses(ses)) => Some(ConstructEmailSender::Ses(ses.clone())),
        Some(EmailSender::Custom(custom)) => Some(ConstructEmailSender::Custom(resolve_sender(custom)?)),
    };
    let sms_sender = match &props.senders.sms {
        None => None,
        Some(SmsSender::Sns(sns)) => Some(ConstructSmsSender::Sns(sns.clone())),
        Some(SmsSender::Custom(custom)) => Some(ConstructSmsSender::Custom(resolve_sender(custom)?)),
    };

    Ok(AuthConstructProps {
        login_with: ConstructLoginWith {
            email: props.login_with.email.clone(),
            phone: props.login_with.phone.clone(),
            external_providers,
        },
        multifactor: props.multifactor.clone(),
        email_sender,
        sms_sender,
        groups: props.groups.clone(),
        physical_id_suffix: generate_props.stable_backend_identifiers.resource_id(name),
    })
}

fn translate_external_providers(
    external: &ExternalProviders,
    resolver: &dyn BackendSecretResolver,
) -> ResolvedExternalProviders {
    let credentials = |pairs: &[(&str, &BackendSecret)]| -> BTreeMap<String, SecretValue> {
        pairs
            .iter()
            .map(|(attribute, secret)| ((*attribute).to_string(), resolver.resolve_secret(secret)))
            .collect()
    };
    let social = |provider_type: &str, provider: &SocialProvider| ResolvedProvider {
        provider_type: provider_type.to_string(),
        provider_name: provider_type.to_string(),
        credentials: credentials(&[
            ("client_id", &provider.client_id),
            ("client_secret", &provider.client_secret),
        ]),
    };

    let mut providers = Vec::new();
    if let Some(google) = &external.google {
        providers.push(social("Google", google));
    }
    if let Some(facebook) = &external.facebook {
        providers.push(social("Facebook", facebook));
    }
    if let Some(amazon) = &external.login_with_amazon {
        providers.push(social("LoginWithAmazon", amazon));
    }
    if let Some(apple) = &external.sign_in_with_apple {
        providers.push(ResolvedProvider {
            provider_type: "SignInWithApple".to_string(),
            provider_name: "SignInWithApple".to_string(),
            credentials: credentials(&[
                ("client_id", &apple.client_id),
                ("key_id", &apple.key_id),
                ("private_key", &apple.private_key),
                ("team_id", &apple.team_id),
            ]),
        });
    }
    for oidc in &external.oidc {
        providers.push(ResolvedProvider {
            provider_type: "OIDC".to_string(),
            provider_name: oidc.name.clone(),
            credentials: credentials(&[
                ("client_id", &oidc.client_id),
                ("client_secret", &oidc.client_secret),
            ]),
        });
    }
    if let Some(saml) = &external.saml {
        providers.push(ResolvedProvider {
            provider_type: "SAML".to_string(),
            provider_name: saml.name.clone(),
            credentials: BTreeMap::new(),
        });
    }

    ResolvedExternalProviders {
        providers,
        callback_urls: external.callback_urls.clone(),
        logout_urls: external.logout_urls.clone(),
        scopes: external.scopes.clone(),
        domain_prefix: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::LoginWith;
    use bdk_platform::{
        secret, BackendIdentifier, DefaultBackendSecretResolver, SsmEnvironmentEntriesGenerator, Stack,
        StableBackendIdentifiers,
    };
    use bdk_test_utils::get_instance_props;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn providers_get_secret_references_and_domain_prefix() {
        let id = BackendIdentifier::sandbox("app", "dev");
        let resolver = DefaultBackendSecretResolver::new(id.clone());
        let ssm = SsmEnvironmentEntriesGenerator::new(id.clone());
        let stable = StableBackendIdentifiers::new(id);
        let generate_props = GenerateContainerEntryProps {
            scope: Arc::new(Stack::new("s", "us-east-1", "1")),
            backend_secret_resolver: &resolver,
            ssm_environment_entries_generator: &ssm,
            stable_backend_identifiers: &stable,
        };
        let props = AuthProps::new(LoginWith::email().with_external_providers(ExternalProviders {
            google: Some(SocialProvider {
                client_id: secret("GOOGLE_CLIENT_ID"),
                client_secret: secret("GOOGLE_CLIENT_SECRET"),
                scopes: vec![],
            }),
            callback_urls: vec!["https://app/".into()],
            logout_urls: vec!["https://app/out".into()],
            ..ExternalProviders::default()
        }));

        let translated = translate_auth_props("amplifyAuth", &props, &generate_props, &get_instance_props()).unwrap();
        let external = translated.login_with.external_providers.unwrap();

        assert_eq!(external.domain_prefix.as_deref(), Some(stable.get_stable_backend_hash()));
        let google = &external.providers[0];
        assert_eq!(google.provider_type, "Google");
        assert_eq!(
            google.credentials["client_id"].parameter_path(),
            "/amplify/app/dev-sandbox/GOOGLE_CLIENT_ID"
        );
        assert_eq!(translated.physical_id_suffix, stable.resource_id("amplifyAuth"));
    }
}
