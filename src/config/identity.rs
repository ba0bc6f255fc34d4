use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity provider configuration.
///
/// These values are published to the domain's SSO settings on every
/// synchronization, so changing them here and re-authorizing a domain is
/// enough to repoint the domain at a new IdP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityProviderConfig {
    /// IdP entity identifier.
    pub entity_id: String,

    /// Signing certificate in PEM format.
    /// Mutually exclusive with `certificate_path`.
    #[serde(default)]
    pub certificate_pem: Option<String>,

    /// Path to a PEM file holding the signing certificate.
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,

    /// SAML sign-on endpoint published as `samlSignonUri`.
    #[serde(default)]
    pub login_url: String,

    /// SAML logout endpoint published as `samlLogoutUri`.
    #[serde(default)]
    pub logout_url: String,

    /// Password change page published as `changePasswordUri`.
    #[serde(default)]
    pub change_password_url: String,
}

impl IdentityProviderConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.entity_id.trim().is_empty() {
            return Err("identity_provider.entity_id must not be empty".to_string());
        }
        match (&self.certificate_pem, &self.certificate_path) {
            (Some(_), Some(_)) => Err(
                "identity_provider: set only one of certificate_pem and certificate_path"
                    .to_string(),
            ),
            (None, None) => Err(
                "identity_provider: one of certificate_pem or certificate_path is required"
                    .to_string(),
            ),
            _ => Ok(()),
        }
    }

    /// Read the signing certificate PEM, from the inline value or the file.
    pub fn certificate_pem(&self) -> std::io::Result<String> {
        match (&self.certificate_pem, &self.certificate_path) {
            (Some(pem), _) => Ok(pem.clone()),
            (None, Some(path)) => std::fs::read_to_string(path),
            (None, None) => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no signing certificate configured",
            )),
        }
    }
}
