//! Registers the Google Workspace service provider template and request hook
//! with the SAML engine.

use std::sync::Arc;

use crate::saml::{
    AuthnRequest, AuthnRequestHook, MailboxAddressResolver, MailboxAttributeProvider, SamlEngine,
    SamlError, ServiceProvider, ServiceProviderTemplate, google,
};

pub const TEMPLATE_ID: &str = "gsuite-sso";
pub const HOOK_ID: &str = "gsuite-sso";

pub struct IdentityTemplateRegistrar {
    resolver: Arc<MailboxAddressResolver>,
}

impl IdentityTemplateRegistrar {
    /// Register the template and hook. Nothing is sent anywhere until the
    /// engine dispatches a request to a provider created from the template.
    pub fn register(engine: &dyn SamlEngine, resolver: Arc<MailboxAddressResolver>) -> Self {
        engine.register_template(Arc::new(GoogleWorkspaceTemplate));
        engine.register_hook(Arc::new(GoogleWorkspaceHook {
            resolver: resolver.clone(),
        }));
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<MailboxAddressResolver> {
        &self.resolver
    }
}

struct GoogleWorkspaceTemplate;

impl ServiceProviderTemplate for GoogleWorkspaceTemplate {
    fn id(&self) -> &str {
        TEMPLATE_ID
    }

    fn name(&self) -> &str {
        "G Suite"
    }

    fn metadata(&self, domain: &str) -> String {
        google::metadata(domain)
    }

    fn configure(&self, sp: &mut ServiceProvider) {
        sp.handler = Some(HOOK_ID.to_string());
    }
}

struct GoogleWorkspaceHook {
    resolver: Arc<MailboxAddressResolver>,
}

impl AuthnRequestHook for GoogleWorkspaceHook {
    fn id(&self) -> &str {
        HOOK_ID
    }

    fn handle(&self, request: &mut AuthnRequest, sp: &ServiceProvider) -> Result<(), SamlError> {
        request
            .attribute_providers
            .add(Arc::new(MailboxAttributeProvider::new(self.resolver.clone())));
        let descriptor = sp.entity_descriptor()?;
        google::request_setup(request, &descriptor)
    }
}
