//! Startup assembly of the SSO bridge.
//!
//! A [`Plugin`] declares which option keys it needs and which it publishes.
//! Assembly runs once per process, before anything serves traffic; a failure
//! here must abort startup rather than leave a half-wired bridge behind.

mod options;

pub use options::PluginOptions;

use crate::{
    admin::AdminApp,
    config::{AdminApiConfig, PluginKeysConfig},
    saml::SamlIdp,
    sso::GoogleWorkspaceSso,
};

/// Error type for startup assembly.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Required option '{key}' is not set")]
    MissingDependency { key: String },

    #[error("Option '{key}' holds a {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Option '{key}' has already been provided")]
    AlreadyProvided { key: String },
}

pub trait Plugin {
    /// Keys that must be present before [`Plugin::assemble`] runs.
    fn required_keys(&self) -> Vec<String>;

    /// Keys set by a successful [`Plugin::assemble`].
    fn provided_keys(&self) -> Vec<String>;

    fn assemble(&self, options: &mut PluginOptions) -> Result<(), WiringError>;
}

/// Builds a [`GoogleWorkspaceSso`] from a [`SamlIdp`] and an [`AdminApp`].
#[derive(Debug, Clone)]
pub struct GoogleWorkspaceSsoPlugin {
    keys: PluginKeysConfig,
    admin: AdminApiConfig,
}

impl GoogleWorkspaceSsoPlugin {
    pub fn new(keys: PluginKeysConfig, admin: AdminApiConfig) -> Self {
        Self { keys, admin }
    }
}

impl Plugin for GoogleWorkspaceSsoPlugin {
    fn required_keys(&self) -> Vec<String> {
        vec![self.keys.saml_idp_key.clone(), self.keys.admin_app_key.clone()]
    }

    fn provided_keys(&self) -> Vec<String> {
        vec![self.keys.sso_key.clone()]
    }

    fn assemble(&self, options: &mut PluginOptions) -> Result<(), WiringError> {
        // Everything is checked before registering with the engine, since
        // registration cannot be undone
        if options.contains(&self.keys.sso_key) {
            return Err(WiringError::AlreadyProvided {
                key: self.keys.sso_key.clone(),
            });
        }
        let idp = options.get::<SamlIdp>(&self.keys.saml_idp_key)?;
        let app = options.get::<AdminApp>(&self.keys.admin_app_key)?;

        let sso = GoogleWorkspaceSso::new(idp.as_ref(), self.admin.clone());
        sso.configure_app(&app);
        options.set(self.keys.sso_key.clone(), sso)?;

        tracing::debug!(
            sso_key = %self.keys.sso_key,
            rotate_signing_key = self.admin.rotate_signing_key,
            "Assembled Google Workspace SSO bridge"
        );
        Ok(())
    }
}
