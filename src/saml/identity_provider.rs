use openssl::x509::X509;

use super::SamlError;
use crate::config::IdentityProviderConfig;

/// The IdP whose endpoints and signing certificate are published to domains.
///
/// Created once at startup and shared read-only by every synchronization.
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    entity_id: String,
    certificate_der: Vec<u8>,
    login_url: String,
    logout_url: String,
    change_password_url: String,
}

impl IdentityProvider {
    pub fn new(entity_id: impl Into<String>, certificate_der: Vec<u8>) -> Self {
        Self {
            entity_id: entity_id.into(),
            certificate_der,
            login_url: String::new(),
            logout_url: String::new(),
            change_password_url: String::new(),
        }
    }

    /// Build from config, loading and decoding the PEM signing certificate.
    pub fn from_config(config: &IdentityProviderConfig) -> Result<Self, SamlError> {
        let pem = config
            .certificate_pem()
            .map_err(|e| SamlError::Certificate(format!("failed to read certificate: {e}")))?;
        let der = certificate_der_from_pem(&pem)?;

        Ok(Self::new(config.entity_id.clone(), der)
            .with_login_url(config.login_url.clone())
            .with_logout_url(config.logout_url.clone())
            .with_change_password_url(config.change_password_url.clone()))
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = url.into();
        self
    }

    pub fn with_change_password_url(mut self, url: impl Into<String>) -> Self {
        self.change_password_url = url.into();
        self
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Raw DER bytes of the signing certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }

    pub fn change_password_url(&self) -> &str {
        &self.change_password_url
    }
}

fn certificate_der_from_pem(pem: &str) -> Result<Vec<u8>, SamlError> {
    let cert = X509::from_pem(pem.as_bytes())
        .map_err(|e| SamlError::Certificate(format!("failed to parse PEM: {e}")))?;
    cert.to_der()
        .map_err(|e| SamlError::Certificate(format!("failed to encode DER: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn generate_test_certificate_pem() -> String {
        use openssl::{
            asn1::Asn1Time,
            bn::BigNum,
            hash::MessageDigest,
            pkey::PKey,
            rsa::Rsa,
            x509::{X509Builder, X509NameBuilder},
        };

        let rsa = Rsa::generate(2048).unwrap();
        let private_key = PKey::from_rsa(rsa).unwrap();

        let mut x509_name = X509NameBuilder::new().unwrap();
        x509_name
            .append_entry_by_text("CN", "idp.example.net")
            .unwrap();
        let x509_name = x509_name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial_number = BigNum::from_u32(1).unwrap();
        builder
            .set_serial_number(&serial_number.to_asn1_integer().unwrap())
            .unwrap();
        builder.set_subject_name(&x509_name).unwrap();
        builder.set_issuer_name(&x509_name).unwrap();
        builder.set_pubkey(&private_key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(&private_key, MessageDigest::sha256()).unwrap();

        String::from_utf8(builder.build().to_pem().unwrap()).unwrap()
    }

    fn config_with_pem(pem: &str) -> IdentityProviderConfig {
        IdentityProviderConfig {
            entity_id: "https://idp.example.net/saml".to_string(),
            certificate_pem: Some(pem.to_string()),
            certificate_path: None,
            login_url: "https://idp/x/login".to_string(),
            logout_url: "https://idp/x/logout".to_string(),
            change_password_url: "https://idp/x/changepw".to_string(),
        }
    }

    #[test]
    fn test_from_config_decodes_certificate() {
        let pem = generate_test_certificate_pem();
        let idp = IdentityProvider::from_config(&config_with_pem(&pem)).unwrap();

        let expected = X509::from_pem(pem.as_bytes()).unwrap().to_der().unwrap();
        assert_eq!(idp.certificate_der(), expected.as_slice());
        assert_eq!(idp.login_url(), "https://idp/x/login");
        assert_eq!(idp.logout_url(), "https://idp/x/logout");
        assert_eq!(idp.change_password_url(), "https://idp/x/changepw");
    }

    #[test]
    fn test_from_config_rejects_garbage_pem() {
        let err = IdentityProvider::from_config(&config_with_pem("not a cert")).unwrap_err();
        assert!(matches!(err, SamlError::Certificate(_)));
    }
}
