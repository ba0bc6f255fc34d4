//! Mailbox address resolution for outgoing assertions.
//!
//! The resolver is a seam: any domain-specific lookup policy can be installed
//! as a [`MailboxAddressFinder`] without touching the request hook. When no
//! finder is installed the resolver answers with an empty address and the
//! assertion simply carries no mailbox attribute.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Attribute, AttributeProvider, AuthnRequest, SamlError, Session};

/// Name of the attribute carrying the resolved mailbox address.
pub const EMAIL_ATTRIBUTE: &str = "email";

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("mailbox lookup failed for domain {domain}: {message}")]
    Lookup { domain: String, message: String },
}

/// Looks up the mailbox address of a session's user within a hosted domain.
pub trait MailboxAddressFinder: Send + Sync {
    fn find(
        &self,
        request: &AuthnRequest,
        session: &Session,
        domain: &str,
    ) -> Result<String, MailboxError>;
}

impl<F> MailboxAddressFinder for F
where
    F: Fn(&AuthnRequest, &Session, &str) -> Result<String, MailboxError> + Send + Sync,
{
    fn find(
        &self,
        request: &AuthnRequest,
        session: &Session,
        domain: &str,
    ) -> Result<String, MailboxError> {
        self(request, session, domain)
    }
}

/// Indirection over an optional, late-bound [`MailboxAddressFinder`].
#[derive(Default)]
pub struct MailboxAddressResolver {
    finder: RwLock<Option<Arc<dyn MailboxAddressFinder>>>,
}

impl MailboxAddressResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_finder(finder: Arc<dyn MailboxAddressFinder>) -> Self {
        Self {
            finder: RwLock::new(Some(finder)),
        }
    }

    /// Install (or replace) the finder consulted by later lookups.
    pub fn set_finder(&self, finder: Arc<dyn MailboxAddressFinder>) {
        *self.finder.write() = Some(finder);
    }

    pub fn clear_finder(&self) {
        *self.finder.write() = None;
    }

    pub fn has_finder(&self) -> bool {
        self.finder.read().is_some()
    }

    /// Resolve the mailbox address, or `""` when no finder is installed.
    pub fn find(
        &self,
        request: &AuthnRequest,
        session: &Session,
        domain: &str,
    ) -> Result<String, MailboxError> {
        // Clone out so the lock is not held across the finder call
        let finder = self.finder.read().clone();
        match finder {
            Some(finder) => finder.find(request, session, domain),
            None => Ok(String::new()),
        }
    }
}

/// Attribute provider that asserts the resolved mailbox address.
pub struct MailboxAttributeProvider {
    resolver: Arc<MailboxAddressResolver>,
}

impl MailboxAttributeProvider {
    pub fn new(resolver: Arc<MailboxAddressResolver>) -> Self {
        Self { resolver }
    }
}

impl AttributeProvider for MailboxAttributeProvider {
    fn name(&self) -> &str {
        "gsuite-mail-address"
    }

    fn attributes(
        &self,
        request: &AuthnRequest,
        session: &Session,
    ) -> Result<Vec<Attribute>, SamlError> {
        let email = self.resolver.find(request, session, &request.domain)?;
        if email.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Attribute::single(EMAIL_ATTRIBUTE, email)])
    }
}
