//! Atom entries understood by the admin settings SSO endpoints.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::saml::IdentityProvider;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const APPS_NS: &str = "http://schemas.google.com/apps/2006";

/// Content type of the request bodies.
pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// The SSO configuration a domain should end up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSsoSettings {
    pub enable_sso: bool,
    pub saml_signon_uri: String,
    pub saml_logout_uri: String,
    pub change_password_uri: String,
    pub sso_whitelist: String,
    pub use_domain_specific_issuer: bool,
}

impl DesiredSsoSettings {
    /// SSO on for everyone, no network-mask whitelist, shared issuer.
    pub fn from_identity_provider(idp: &IdentityProvider) -> Self {
        Self {
            enable_sso: true,
            saml_signon_uri: idp.login_url().to_string(),
            saml_logout_uri: idp.logout_url().to_string(),
            change_password_uri: idp.change_password_url().to_string(),
            sso_whitelist: String::new(),
            use_domain_specific_issuer: false,
        }
    }

    /// Properties in wire order.
    pub fn properties(&self) -> [(&'static str, String); 6] {
        [
            ("enableSSO", self.enable_sso.to_string()),
            ("samlSignonUri", self.saml_signon_uri.clone()),
            ("samlLogoutUri", self.saml_logout_uri.clone()),
            ("changePasswordUri", self.change_password_uri.clone()),
            ("ssoWhitelist", self.sso_whitelist.clone()),
            (
                "useDomainSpecificIssuer",
                self.use_domain_specific_issuer.to_string(),
            ),
        ]
    }

    pub fn to_atom_entry(&self) -> String {
        atom_entry(&self.properties())
    }
}

/// The IdP signing certificate, as uploaded to the signing key endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKeyPayload {
    signing_key: String,
}

impl SigningKeyPayload {
    pub fn from_identity_provider(idp: &IdentityProvider) -> Self {
        Self {
            signing_key: STANDARD.encode(idp.certificate_der()),
        }
    }

    /// Base64 of the certificate's DER bytes.
    pub fn signing_key(&self) -> &str {
        &self.signing_key
    }

    pub fn to_atom_entry(&self) -> String {
        atom_entry(&[("signingKey", self.signing_key.clone())])
    }
}

fn atom_entry(properties: &[(&str, String)]) -> String {
    let mut xml = format!("<atom:entry xmlns:atom='{ATOM_NS}' xmlns:apps='{APPS_NS}'>\n");
    for (name, value) in properties {
        xml.push_str(&format!(
            "<apps:property name='{}' value='{}'/>\n",
            name,
            xml_escape(value)
        ));
    }
    xml.push_str("</atom:entry>");
    xml
}

fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}
