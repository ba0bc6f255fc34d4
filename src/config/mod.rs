//! Configuration module for the SSO bridge.
//!
//! The bridge is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [identity_provider]
//! entity_id = "https://idp.example.net/saml"
//! certificate_path = "/etc/idp/signing.pem"
//! change_password_url = "https://idp.example.net/account/password"
//!
//! [admin]
//! rotate_signing_key = false
//! ```

mod admin;
mod identity;
mod observability;

use std::path::Path;

pub use admin::*;
pub use identity::*;
pub use observability::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the SSO bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// The SAML identity provider whose endpoints are pushed to the domain.
    pub identity_provider: IdentityProviderConfig,

    /// Domain admin settings API configuration.
    #[serde(default)]
    pub admin: AdminApiConfig,

    /// Option keys used when assembling the bridge.
    #[serde(default)]
    pub plugin: PluginKeysConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: BridgeConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.identity_provider
            .validate()
            .map_err(ConfigError::Validation)?;
        self.admin.validate().map_err(ConfigError::Validation)?;
        self.plugin.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

/// Keys under which the bridge's collaborators are looked up and published
/// in the plugin options context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginKeysConfig {
    #[serde(default = "default_saml_idp_key")]
    pub saml_idp_key: String,

    #[serde(default = "default_admin_app_key")]
    pub admin_app_key: String,

    #[serde(default = "default_sso_key")]
    pub sso_key: String,
}

impl Default for PluginKeysConfig {
    fn default() -> Self {
        Self {
            saml_idp_key: default_saml_idp_key(),
            admin_app_key: default_admin_app_key(),
            sso_key: default_sso_key(),
        }
    }
}

impl PluginKeysConfig {
    fn validate(&self) -> Result<(), String> {
        let keys = [&self.saml_idp_key, &self.admin_app_key, &self.sso_key];
        if keys.iter().any(|k| k.trim().is_empty()) {
            return Err("plugin option keys must not be empty".to_string());
        }
        if self.sso_key == self.saml_idp_key || self.sso_key == self.admin_app_key {
            return Err(format!(
                "plugin.sso_key '{}' collides with a required key",
                self.sso_key
            ));
        }
        Ok(())
    }
}

fn default_saml_idp_key() -> String {
    "saml_idp".to_string()
}

fn default_admin_app_key() -> String {
    "gsuite_admin_app".to_string()
}

fn default_sso_key() -> String {
    "gsuite_sso".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR}` references, skipping anything after a `#` comment marker.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid env pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"
[identity_provider]
entity_id = "https://idp.example.net/saml"
certificate_pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----"
change_password_url = "https://idp/x/changepw"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BridgeConfig::from_str(MINIMAL).unwrap();
        assert!(!config.admin.rotate_signing_key);
        assert!(config.admin.check_status);
        assert_eq!(
            config.admin.base_url,
            "https://apps-apis.google.com/a/feeds/domain"
        );
        assert_eq!(config.plugin.saml_idp_key, "saml_idp");
        assert_eq!(config.plugin.sso_key, "gsuite_sso");
        assert_eq!(config.observability.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let input = format!("{MINIMAL}\n[admin]\nrotate_key = true\n");
        let err = BridgeConfig::from_str(&input).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_var_expansion() {
        let input = r#"
[identity_provider]
entity_id = "${SSO_TEST_ENTITY}"
certificate_pem = "pem"
change_password_url = "https://idp/x/changepw" # ${SSO_TEST_UNSET_IN_COMMENT}
"#;
        temp_env::with_var("SSO_TEST_ENTITY", Some("https://idp.test/saml"), || {
            let config = BridgeConfig::from_str(input).unwrap();
            assert_eq!(config.identity_provider.entity_id, "https://idp.test/saml");
        });
    }

    #[test]
    fn test_missing_env_var_is_error() {
        let input = "[identity_provider]\nentity_id = \"${SSO_TEST_DEFINITELY_MISSING}\"\n";
        temp_env::with_var_unset("SSO_TEST_DEFINITELY_MISSING", || {
            let err = BridgeConfig::from_str(input).unwrap_err();
            assert!(
                matches!(err, ConfigError::EnvVarNotFound(ref v) if v == "SSO_TEST_DEFINITELY_MISSING")
            );
        });
    }

    #[test]
    fn test_colliding_plugin_keys_rejected() {
        let input = format!("{MINIMAL}\n[plugin]\nsso_key = \"saml_idp\"\n");
        let err = BridgeConfig::from_str(&input).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.identity_provider.change_password_url,
            "https://idp/x/changepw"
        );
    }

    #[test]
    fn test_from_missing_file() {
        let err = BridgeConfig::from_file("/nonexistent/gsuite-sso.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
