//! Domain SSO settings synchronization.
//!
//! One synchronization pushes the desired SSO settings to a domain, reads
//! them back, and optionally uploads the IdP signing certificate:
//!
//! ```text
//! Start -> SendSsoUpdate -> Verify -> [SendKeyUpdate] -> Done
//!                 \            \             \
//!                  `------------`-------------`--> SyncError
//! ```
//!
//! A failing step ends the run with a [`SyncError`] naming that step; there
//! is no failed state to resume from.
//!
//! Calls are strictly sequential and there is no cross-invocation lock: two
//! concurrent runs for the same domain interleave, and the admin API keeps
//! whichever write lands last. The read-back is logged, never compared.

use std::{fmt, sync::Arc, time::Duration};

use http::StatusCode;
use reqwest::header::CONTENT_TYPE;

use super::settings::{ATOM_CONTENT_TYPE, DesiredSsoSettings, SigningKeyPayload};
use crate::{
    config::AdminApiConfig,
    saml::{IdentityProvider, is_valid_domain},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    Update,
    Verify,
    RotateKey,
}

impl SyncStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStep::Update => "update",
            SyncStep::Verify => "verify",
            SyncStep::RotateKey => "rotate-key",
        }
    }
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Start,
    SendSsoUpdate,
    Verify,
    SendKeyUpdate,
    Done,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid domain name '{0}'")]
    InvalidDomain(String),

    #[error("Failed to build admin API client: {0}")]
    Client(String),

    #[error("SSO {step} request failed: {source}")]
    Transport {
        step: SyncStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("SSO {step} request rejected with status {status}")]
    UpdateFailed {
        step: SyncStep,
        status: StatusCode,
        body: String,
    },

    #[error("Reading back SSO settings returned status {status}")]
    FetchFailed { status: StatusCode, body: String },
}

impl SyncError {
    /// The step that failed, if the failure happened on the wire.
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            SyncError::Transport { step, .. } | SyncError::UpdateFailed { step, .. } => {
                Some(*step)
            }
            SyncError::FetchFailed { .. } => Some(SyncStep::Verify),
            SyncError::InvalidDomain(_) | SyncError::Client(_) => None,
        }
    }
}

/// Outcome of a successful synchronization.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub domain: String,
    /// Steps completed, in order.
    pub steps: Vec<SyncStep>,
    /// Settings as returned by the verification read.
    pub applied_settings: String,
}

pub struct DomainSsoSynchronizer {
    identity_provider: Arc<IdentityProvider>,
    config: AdminApiConfig,
}

impl DomainSsoSynchronizer {
    pub fn new(identity_provider: Arc<IdentityProvider>, config: AdminApiConfig) -> Self {
        Self {
            identity_provider,
            config,
        }
    }

    pub fn config(&self) -> &AdminApiConfig {
        &self.config
    }

    pub fn settings_url(&self, domain: &str) -> String {
        format!(
            "{}/2.0/{}/sso/general",
            self.config.base_url.trim_end_matches('/'),
            domain
        )
    }

    pub fn signing_key_url(&self, domain: &str) -> String {
        format!(
            "{}/2.0/{}/sso/signingkey",
            self.config.base_url.trim_end_matches('/'),
            domain
        )
    }

    pub fn desired_settings(&self) -> DesiredSsoSettings {
        DesiredSsoSettings::from_identity_provider(&self.identity_provider)
    }

    /// Run one synchronization for `domain` with an already authenticated client.
    pub async fn synchronize(
        &self,
        client: &reqwest::Client,
        domain: &str,
    ) -> Result<SyncReport, SyncError> {
        validate_domain(domain)?;

        let mut report = SyncReport {
            domain: domain.to_string(),
            steps: Vec::new(),
            applied_settings: String::new(),
        };
        let mut state = SyncState::Start;

        loop {
            match self.advance(state, client, &mut report).await {
                Ok(Some(next)) => {
                    tracing::trace!(
                        domain = %domain,
                        from = ?state,
                        to = ?next,
                        "SSO sync transition"
                    );
                    state = next;
                }
                Ok(None) => return Ok(report),
                Err(e) => {
                    tracing::debug!(
                        domain = %domain,
                        from = ?state,
                        error = %e,
                        "SSO sync failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Run the work of `state` and return the state to move to, or `None`
    /// once `Done` is reached.
    async fn advance(
        &self,
        state: SyncState,
        client: &reqwest::Client,
        report: &mut SyncReport,
    ) -> Result<Option<SyncState>, SyncError> {
        let domain = report.domain.as_str();
        let next = match state {
            SyncState::Start => SyncState::SendSsoUpdate,
            SyncState::SendSsoUpdate => {
                let body = self.desired_settings().to_atom_entry();
                tracing::debug!(domain = %domain, settings = %body, "Updating SSO settings");

                let request = client
                    .put(self.settings_url(domain))
                    .header(CONTENT_TYPE, ATOM_CONTENT_TYPE)
                    .body(body);
                let (status, body) = self.send(SyncStep::Update, request).await?;
                if self.config.check_status && !status.is_success() {
                    return Err(SyncError::UpdateFailed {
                        step: SyncStep::Update,
                        status,
                        body,
                    });
                }

                report.steps.push(SyncStep::Update);
                SyncState::Verify
            }
            SyncState::Verify => {
                let request = client.get(self.settings_url(domain));
                let (status, body) = self.send(SyncStep::Verify, request).await?;
                if self.config.check_status && !status.is_success() {
                    return Err(SyncError::FetchFailed { status, body });
                }
                tracing::debug!(
                    domain = %domain,
                    status = %status,
                    settings = %body,
                    "Applied SSO settings"
                );

                report.applied_settings = body;
                report.steps.push(SyncStep::Verify);
                if self.config.rotate_signing_key {
                    SyncState::SendKeyUpdate
                } else {
                    SyncState::Done
                }
            }
            SyncState::SendKeyUpdate => {
                let payload = SigningKeyPayload::from_identity_provider(&self.identity_provider);
                tracing::debug!(domain = %domain, "Updating SSO signing key");

                let request = client
                    .put(self.signing_key_url(domain))
                    .header(CONTENT_TYPE, ATOM_CONTENT_TYPE)
                    .body(payload.to_atom_entry());
                let (status, body) = self.send(SyncStep::RotateKey, request).await?;
                if self.config.check_status && !status.is_success() {
                    return Err(SyncError::UpdateFailed {
                        step: SyncStep::RotateKey,
                        status,
                        body,
                    });
                }

                report.steps.push(SyncStep::RotateKey);
                SyncState::Done
            }
            SyncState::Done => return Ok(None),
        };
        Ok(Some(next))
    }

    /// Send a request and read the full body. Only network and body-read
    /// errors fail here; status handling is up to the caller.
    async fn send(
        &self,
        step: SyncStep,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), SyncError> {
        let response = request
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|source| SyncError::Transport { step, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| SyncError::Transport { step, source })?;

        Ok((status, body))
    }
}

/// Hosted domain names end up in a URL path segment.
fn validate_domain(domain: &str) -> Result<(), SyncError> {
    if is_valid_domain(domain) {
        Ok(())
    } else {
        Err(SyncError::InvalidDomain(domain.to_string()))
    }
}
