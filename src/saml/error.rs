use super::mailbox::MailboxError;

/// Errors raised while registering with or dispatching through the SAML engine.
#[derive(Debug, thiserror::Error)]
pub enum SamlError {
    #[error("Invalid IdP signing certificate: {0}")]
    Certificate(String),

    #[error("Failed to parse service provider metadata: {0}")]
    Metadata(String),

    #[error("Invalid domain name '{0}'")]
    InvalidDomain(String),

    #[error("Service provider metadata has no assertion consumer service")]
    MissingAcs,

    #[error("No service provider template registered with id '{0}'")]
    TemplateNotFound(String),

    #[error("No authn request hook registered with id '{0}'")]
    HookNotFound(String),

    #[error("Mailbox address lookup failed: {0}")]
    Mailbox(#[from] MailboxError),
}
