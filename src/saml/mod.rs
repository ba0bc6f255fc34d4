//! SAML engine collaborator surface.
//!
//! The SAML protocol itself (parsing, signing, assertion building) lives in
//! the engine; this module holds the narrow interface the SSO bridge plugs
//! into, plus the Google-specific request setup and mailbox resolution.

mod engine;
mod error;
pub mod google;
mod identity_provider;
pub mod mailbox;
mod request;

pub use engine::{
    AuthnRequestHook, DOMAIN_PLACEHOLDER, SamlEngine, SamlIdp, ServiceProvider,
    ServiceProviderTemplate,
};
pub(crate) use engine::is_valid_domain;
pub use error::SamlError;
pub use identity_provider::IdentityProvider;
pub use mailbox::{
    MailboxAddressFinder, MailboxAddressResolver, MailboxAttributeProvider, MailboxError,
};
pub use request::{Attribute, AttributeProvider, AttributeProviders, AuthnRequest, Session};

#[cfg(test)]
pub(crate) use identity_provider::tests::generate_test_certificate_pem;
