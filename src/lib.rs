//! Bridge between a SAML identity provider and Google Workspace single sign-on.
//!
//! At startup [`wiring::GoogleWorkspaceSsoPlugin`] registers the Google service
//! provider template with the SAML engine and hooks into the admin app. Once a
//! domain administrator authorizes the app, the domain's SSO settings are
//! pushed to the admin settings API by [`sso::DomainSsoSynchronizer`].

pub mod admin;
pub mod config;
#[cfg(feature = "cli")]
pub mod observability;
pub mod saml;
pub mod sso;
pub mod wiring;

pub use config::{BridgeConfig, ConfigError};
pub use sso::GoogleWorkspaceSso;
pub use wiring::{GoogleWorkspaceSsoPlugin, Plugin, PluginOptions, WiringError};
