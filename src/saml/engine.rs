//! Registration surface of the SAML engine.
//!
//! Integrations plug into the engine through two extension points:
//!
//! - a [`ServiceProviderTemplate`] renders SP metadata for a new service
//!   provider and may configure it (for example, pin which hook answers it);
//! - an [`AuthnRequestHook`] runs for every authentication request addressed
//!   to a service provider that names the hook.
//!
//! Both are handed to the engine explicitly through [`SamlEngine`].

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use samael::metadata::EntityDescriptor;
use uuid::Uuid;

use super::{AuthnRequest, IdentityProvider, SamlError};

/// Placeholder substituted with the hosted domain after a template renders.
pub const DOMAIN_PLACEHOLDER: &str = "{{DOMAIN}}";

/// Hosted domain names are substituted into XML attributes and URL paths
/// unescaped, so only plain DNS names are accepted.
pub(crate) fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// A service provider created from a template for one hosted domain.
#[derive(Debug, Clone)]
pub struct ServiceProvider {
    pub id: Uuid,
    pub domain: String,
    pub template_id: String,
    pub metadata_xml: String,
    /// Id of the [`AuthnRequestHook`] that answers this provider's requests.
    pub handler: Option<String>,
}

impl ServiceProvider {
    /// Parse the provider's metadata into an entity descriptor.
    pub fn entity_descriptor(&self) -> Result<EntityDescriptor, SamlError> {
        samael::metadata::de::from_str(&self.metadata_xml)
            .map_err(|e| SamlError::Metadata(e.to_string()))
    }
}

pub trait ServiceProviderTemplate: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable name shown when picking a template.
    fn name(&self) -> &str;

    /// Render SP metadata with `domain` standing in for the hosted domain.
    fn metadata(&self, domain: &str) -> String;

    fn configure(&self, sp: &mut ServiceProvider);
}

pub trait AuthnRequestHook: Send + Sync {
    fn id(&self) -> &str;

    fn handle(&self, request: &mut AuthnRequest, sp: &ServiceProvider) -> Result<(), SamlError>;
}

/// The engine operations an integration needs at registration time.
pub trait SamlEngine: Send + Sync {
    fn identity_provider(&self) -> Arc<IdentityProvider>;

    fn register_template(&self, template: Arc<dyn ServiceProviderTemplate>);

    fn register_hook(&self, hook: Arc<dyn AuthnRequestHook>);
}

/// In-process SAML IdP handle holding registered templates and hooks.
pub struct SamlIdp {
    identity_provider: Arc<IdentityProvider>,
    templates: RwLock<Vec<Arc<dyn ServiceProviderTemplate>>>,
    hooks: RwLock<HashMap<String, Arc<dyn AuthnRequestHook>>>,
}

impl SamlIdp {
    pub fn new(identity_provider: IdentityProvider) -> Self {
        Self {
            identity_provider: Arc::new(identity_provider),
            templates: RwLock::new(Vec::new()),
            hooks: RwLock::new(HashMap::new()),
        }
    }

    pub fn template(&self, id: &str) -> Option<Arc<dyn ServiceProviderTemplate>> {
        self.templates.read().iter().find(|t| t.id() == id).cloned()
    }

    pub fn template_ids(&self) -> Vec<String> {
        self.templates
            .read()
            .iter()
            .map(|t| t.id().to_string())
            .collect()
    }

    pub fn hook(&self, id: &str) -> Option<Arc<dyn AuthnRequestHook>> {
        self.hooks.read().get(id).cloned()
    }

    /// Render the template's metadata for `domain` and let it configure the
    /// new service provider.
    pub fn create_service_provider(
        &self,
        template_id: &str,
        domain: &str,
    ) -> Result<ServiceProvider, SamlError> {
        if !is_valid_domain(domain) {
            return Err(SamlError::InvalidDomain(domain.to_string()));
        }
        let template = self
            .template(template_id)
            .ok_or_else(|| SamlError::TemplateNotFound(template_id.to_string()))?;

        let metadata_xml = template
            .metadata(DOMAIN_PLACEHOLDER)
            .replace(DOMAIN_PLACEHOLDER, domain);

        let mut sp = ServiceProvider {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            template_id: template_id.to_string(),
            metadata_xml,
            handler: None,
        };
        template.configure(&mut sp);

        tracing::debug!(
            template_id = %template_id,
            domain = %domain,
            handler = ?sp.handler,
            "Created service provider from template"
        );

        Ok(sp)
    }

    /// Run the hook named by `sp` against an incoming request.
    ///
    /// Providers without a handler are passed through untouched.
    pub fn dispatch(
        &self,
        request: &mut AuthnRequest,
        sp: &ServiceProvider,
    ) -> Result<(), SamlError> {
        let Some(handler) = sp.handler.as_deref() else {
            return Ok(());
        };
        let hook = self
            .hook(handler)
            .ok_or_else(|| SamlError::HookNotFound(handler.to_string()))?;
        hook.handle(request, sp)
    }
}

impl SamlEngine for SamlIdp {
    fn identity_provider(&self) -> Arc<IdentityProvider> {
        self.identity_provider.clone()
    }

    fn register_template(&self, template: Arc<dyn ServiceProviderTemplate>) {
        tracing::debug!(template_id = %template.id(), "Registered service provider template");
        self.templates.write().push(template);
    }

    /// Hooks are keyed by id; registering an id twice replaces the earlier hook.
    fn register_hook(&self, hook: Arc<dyn AuthnRequestHook>) {
        tracing::debug!(hook_id = %hook.id(), "Registered authn request hook");
        self.hooks.write().insert(hook.id().to_string(), hook);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct EchoTemplate;

    impl ServiceProviderTemplate for EchoTemplate {
        fn id(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn metadata(&self, domain: &str) -> String {
            format!("<sp domain=\"{domain}\"/>")
        }

        fn configure(&self, sp: &mut ServiceProvider) {
            sp.handler = Some("echo-hook".to_string());
        }
    }

    struct RelayHook;

    impl AuthnRequestHook for RelayHook {
        fn id(&self) -> &str {
            "echo-hook"
        }

        fn handle(
            &self,
            request: &mut AuthnRequest,
            sp: &ServiceProvider,
        ) -> Result<(), SamlError> {
            request.relay_state = Some(sp.domain.clone());
            Ok(())
        }
    }

    fn idp() -> SamlIdp {
        SamlIdp::new(IdentityProvider::new("https://idp.example.net", vec![1, 2, 3]))
    }

    #[test]
    fn test_create_service_provider_substitutes_domain() {
        let idp = idp();
        idp.register_template(Arc::new(EchoTemplate));

        let sp = idp.create_service_provider("echo", "example.com").unwrap();
        assert_eq!(sp.metadata_xml, "<sp domain=\"example.com\"/>");
        assert_eq!(sp.handler.as_deref(), Some("echo-hook"));
        assert_eq!(sp.template_id, "echo");
    }

    #[rstest]
    #[case("evil.com\" x=\"")]
    #[case("a&b.com")]
    #[case("<example>.com")]
    #[case("")]
    fn test_create_service_provider_rejects_invalid_domain(#[case] domain: &str) {
        let idp = idp();
        idp.register_template(Arc::new(EchoTemplate));

        let err = idp.create_service_provider("echo", domain).unwrap_err();
        assert!(matches!(err, SamlError::InvalidDomain(ref d) if d == domain));
    }

    #[rstest]
    #[case("example.com", true)]
    #[case("mail-1.example.co.uk", true)]
    #[case("localhost", true)]
    #[case("a..b", false)]
    #[case("-a.com", false)]
    #[case("a-.com", false)]
    #[case(".example.com", false)]
    #[case("example.com.", false)]
    #[case("exa mple.com", false)]
    #[case("example.com/../other", false)]
    fn test_domain_rule(#[case] domain: &str, #[case] valid: bool) {
        assert_eq!(is_valid_domain(domain), valid);
    }

    #[test]
    fn test_domain_label_length_limits() {
        let label = "a".repeat(63);
        assert!(is_valid_domain(&format!("{label}.com")));
        assert!(!is_valid_domain(&format!("{label}a.com")));
        let long = vec![label.as_str(); 4].join(".");
        assert_eq!(long.len(), 255);
        assert!(!is_valid_domain(&long));
    }

    #[test]
    fn test_unknown_template() {
        let err = idp().create_service_provider("missing", "example.com").unwrap_err();
        assert!(matches!(err, SamlError::TemplateNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_dispatch_runs_named_hook() {
        let idp = idp();
        idp.register_template(Arc::new(EchoTemplate));
        idp.register_hook(Arc::new(RelayHook));
        let sp = idp.create_service_provider("echo", "example.com").unwrap();

        let mut request = AuthnRequest::new("req-1", "example.com");
        idp.dispatch(&mut request, &sp).unwrap();
        assert_eq!(request.relay_state.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_dispatch_unregistered_hook() {
        let idp = idp();
        idp.register_template(Arc::new(EchoTemplate));
        let sp = idp.create_service_provider("echo", "example.com").unwrap();

        let mut request = AuthnRequest::new("req-1", "example.com");
        let err = idp.dispatch(&mut request, &sp).unwrap_err();
        assert!(matches!(err, SamlError::HookNotFound(_)));
    }

    #[test]
    fn test_dispatch_without_handler_is_noop() {
        let sp = ServiceProvider {
            id: Uuid::new_v4(),
            domain: "example.com".to_string(),
            template_id: "manual".to_string(),
            metadata_xml: String::new(),
            handler: None,
        };
        let mut request = AuthnRequest::new("req-1", "example.com");
        idp().dispatch(&mut request, &sp).unwrap();
        assert!(request.relay_state.is_none());
    }
}
