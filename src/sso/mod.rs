//! Google Workspace SSO bridge.
//!
//! [`GoogleWorkspaceSso`] ties the pieces together: it registers the Google
//! service provider template with the SAML engine, asks the admin app for the
//! scopes needed to manage SSO settings, and synchronizes a domain's SSO
//! settings as soon as the admin app hands over a token for it.

pub mod registrar;
pub mod settings;
pub mod sync;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

pub use registrar::IdentityTemplateRegistrar;
pub use settings::{DesiredSsoSettings, SigningKeyPayload};
pub use sync::{DomainSsoSynchronizer, SyncError, SyncReport, SyncState, SyncStep};

use crate::{
    admin::{
        AdminApp, AdminAppError, DomainToken, RequestContext, ScopeAppender, Scopes, SetupHandler,
    },
    config::AdminApiConfig,
    saml::{MailboxAddressFinder, MailboxAddressResolver, SamlEngine},
};

/// Admin settings API scope. See
/// <https://developers.google.com/admin-sdk/admin-settings/auth>.
pub const ADMIN_SETTINGS_SCOPE: &str = "https://apps-apis.google.com/a/feeds/domain/";

/// Directory API scope for reading users.
pub const ADMIN_DIRECTORY_USER_SCOPE: &str = "https://www.googleapis.com/auth/admin.directory.user";

pub struct GoogleWorkspaceSso {
    registrar: IdentityTemplateRegistrar,
    synchronizer: DomainSsoSynchronizer,
}

impl GoogleWorkspaceSso {
    /// Register with `engine` and prepare a synchronizer for its identity provider.
    pub fn new(engine: &dyn SamlEngine, config: AdminApiConfig) -> Arc<Self> {
        let resolver = Arc::new(MailboxAddressResolver::new());
        let registrar = IdentityTemplateRegistrar::register(engine, resolver);
        let synchronizer = DomainSsoSynchronizer::new(engine.identity_provider(), config);

        Arc::new(Self {
            registrar,
            synchronizer,
        })
    }

    /// Hook into the admin app's scope collection and post-authorization setup.
    pub fn configure_app(self: &Arc<Self>, app: &AdminApp) {
        app.scope_appender(self.clone());
        app.setup_handler(self.clone());
    }

    pub fn set_mailbox_finder(&self, finder: Arc<dyn MailboxAddressFinder>) {
        self.registrar.resolver().set_finder(finder);
    }

    pub fn synchronizer(&self) -> &DomainSsoSynchronizer {
        &self.synchronizer
    }

    /// Synchronize the token's domain using a client built for that token.
    ///
    /// The client lives only for this call, so its pooled connections are
    /// closed on every return path.
    pub async fn synchronize(
        &self,
        app: &AdminApp,
        token: &DomainToken,
    ) -> Result<SyncReport, SyncError> {
        let client = app
            .client(&token.token)
            .map_err(|e| SyncError::Client(e.to_string()))?;
        let result = self.synchronizer.synchronize(&client, &token.domain).await;
        drop(client);
        result
    }
}

impl ScopeAppender for GoogleWorkspaceSso {
    fn append_scopes(
        &self,
        _app: &AdminApp,
        scopes: &mut Scopes,
        _ctx: &RequestContext,
    ) -> Result<(), AdminAppError> {
        scopes.add([ADMIN_SETTINGS_SCOPE, ADMIN_DIRECTORY_USER_SCOPE]);
        Ok(())
    }
}

#[async_trait]
impl SetupHandler for GoogleWorkspaceSso {
    async fn setup(
        &self,
        app: &AdminApp,
        token: &DomainToken,
        ctx: &RequestContext,
    ) -> Result<(), AdminAppError> {
        let span = tracing::info_span!(
            "gsuite_sso_setup",
            site = %ctx.site,
            domain = %token.domain,
            request_id = %ctx.request_id,
        );

        async {
            tracing::debug!("start");
            match self.synchronize(app, token).await {
                Ok(report) => {
                    tracing::debug!(steps = ?report.steps, "done");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, step = ?e.step(), "failed");
                    Err(AdminAppError::Setup {
                        domain: token.domain.clone(),
                        source: Box::new(e),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}
