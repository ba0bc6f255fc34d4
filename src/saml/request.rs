//! Incoming SAML authentication request model.
//!
//! Only the parts of an AuthnRequest this bridge touches are modelled: the
//! destination, audience and NameID format that the provider-specific setup
//! rewrites, and the list of attribute providers that contribute claims to
//! the eventual assertion.

use std::{fmt, sync::Arc};

use super::SamlError;

/// A claim contributed to an outgoing assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

impl Attribute {
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// The authenticated user session an assertion is issued for.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: String,
    pub user_name: String,
    pub user_email: Option<String>,
}

/// Contributes named claims to the assertion answering a request.
pub trait AttributeProvider: Send + Sync {
    fn name(&self) -> &str;

    fn attributes(
        &self,
        request: &AuthnRequest,
        session: &Session,
    ) -> Result<Vec<Attribute>, SamlError>;
}

/// Ordered list of attribute providers attached to a request.
#[derive(Clone, Default)]
pub struct AttributeProviders {
    providers: Vec<Arc<dyn AttributeProvider>>,
}

impl AttributeProviders {
    pub fn add(&mut self, provider: Arc<dyn AttributeProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AttributeProvider>> {
        self.providers.iter()
    }
}

impl fmt::Debug for AttributeProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// An SP-initiated authentication request being answered by the IdP.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    pub id: String,
    /// Hosted domain of the service provider the request came from.
    pub domain: String,
    /// Where the response is posted.
    pub acs_url: Option<String>,
    /// Audience restriction for the assertion.
    pub audience: Option<String>,
    pub name_id_format: Option<String>,
    pub relay_state: Option<String>,
    pub attribute_providers: AttributeProviders,
}

impl AuthnRequest {
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            acs_url: None,
            audience: None,
            name_id_format: None,
            relay_state: None,
            attribute_providers: AttributeProviders::default(),
        }
    }

    /// Gather the attributes of every attached provider, in attachment order.
    pub fn collect_attributes(&self, session: &Session) -> Result<Vec<Attribute>, SamlError> {
        let mut attributes = Vec::new();
        for provider in self.attribute_providers.iter() {
            attributes.extend(provider.attributes(self, session)?);
        }
        Ok(attributes)
    }
}
