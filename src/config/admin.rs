use serde::{Deserialize, Serialize};

/// Domain admin settings API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminApiConfig {
    /// Base URL of the admin settings feeds. Domain-scoped endpoints are
    /// built as `{base_url}/2.0/{domain}/sso/...`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Push the IdP signing certificate to the domain after the settings
    /// update has been verified.
    #[serde(default)]
    pub rotate_signing_key: bool,

    /// Treat non-2xx responses from the admin API as failures.
    ///
    /// When disabled, any response that arrives counts as success and only
    /// transport errors abort a synchronization.
    #[serde(default = "default_true")]
    pub check_status: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AdminApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            rotate_signing_key: false,
            check_status: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AdminApiConfig {
    pub(super) fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("admin.base_url '{}' is not a valid URL: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "admin.base_url must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if self.timeout_secs == 0 {
            return Err("admin.timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://apps-apis.google.com/a/feeds/domain".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}
