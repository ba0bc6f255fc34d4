//! Google Workspace service provider driver.
//!
//! Google's SP is not discoverable through a metadata URL, so its metadata is
//! rendered from a fixed shape: the entity id is `google.com/a/{domain}` and
//! assertions are posted to `https://www.google.com/a/{domain}/acs`.

use samael::metadata::EntityDescriptor;

use super::{AuthnRequest, SamlError};

pub const EMAIL_NAME_ID_FORMAT: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";

const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// Render Google's SP metadata for `domain`.
pub fn metadata(domain: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="google.com/a/{domain}">
  <md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:NameIDFormat>{name_id_format}</md:NameIDFormat>
    <md:AssertionConsumerService
        Binding="{binding}"
        Location="https://www.google.com/a/{domain}/acs"
        index="1"
        isDefault="true"/>
  </md:SPSSODescriptor>
</md:EntityDescriptor>"#,
        domain = domain,
        name_id_format = EMAIL_NAME_ID_FORMAT,
        binding = HTTP_POST_BINDING,
    )
}

/// Prepare a request addressed to Google: email NameID, the SP's default
/// ACS as destination, and the SP entity id as audience.
pub fn request_setup(
    request: &mut AuthnRequest,
    descriptor: &EntityDescriptor,
) -> Result<(), SamlError> {
    let services: Vec<_> = descriptor
        .sp_sso_descriptors
        .iter()
        .flatten()
        .flat_map(|sp| sp.assertion_consumer_services.iter())
        .collect();
    let acs = services
        .iter()
        .find(|acs| acs.is_default == Some(true))
        .or_else(|| services.first())
        .ok_or(SamlError::MissingAcs)?;

    request.acs_url = Some(acs.location.clone());
    request.audience = descriptor.entity_id.clone();
    request.name_id_format = Some(EMAIL_NAME_ID_FORMAT.to_string());
    Ok(())
}
