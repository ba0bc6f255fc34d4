//! Domain admin app collaborator.
//!
//! The admin app drives OAuth authorization for a hosted domain. Integrations
//! hook into it twice: a [`ScopeAppender`] adds the scopes it needs before the
//! consent screen is shown, and a [`SetupHandler`] runs once a [`DomainToken`]
//! has been obtained.

mod client;
mod token;

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
pub use client::{BearerClientFactory, ClientFactory};
use parking_lot::RwLock;
pub use token::{DomainToken, OAuthToken, RequestContext};

/// Error type for admin app operations.
#[derive(Debug, thiserror::Error)]
pub enum AdminAppError {
    #[error("Failed to build admin API client: {0}")]
    Client(String),

    #[error("OAuth token has expired")]
    ExpiredToken,

    #[error("Setup for domain {domain} failed: {source}")]
    Setup {
        domain: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Set of OAuth scopes requested during token acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    pub fn add<I, S>(&mut self, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(scopes.into_iter().map(Into::into));
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Space-delimited form used in an OAuth authorization request.
    pub fn to_param(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

pub trait ScopeAppender: Send + Sync {
    fn append_scopes(
        &self,
        app: &AdminApp,
        scopes: &mut Scopes,
        ctx: &RequestContext,
    ) -> Result<(), AdminAppError>;
}

#[async_trait]
pub trait SetupHandler: Send + Sync {
    async fn setup(
        &self,
        app: &AdminApp,
        token: &DomainToken,
        ctx: &RequestContext,
    ) -> Result<(), AdminAppError>;
}

pub struct AdminApp {
    client_factory: Arc<dyn ClientFactory>,
    base_scopes: Scopes,
    scope_appenders: RwLock<Vec<Arc<dyn ScopeAppender>>>,
    setup_handlers: RwLock<Vec<Arc<dyn SetupHandler>>>,
}

impl AdminApp {
    pub fn new(client_factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            client_factory,
            base_scopes: Scopes::default(),
            scope_appenders: RwLock::new(Vec::new()),
            setup_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Scopes requested regardless of which integrations are registered.
    pub fn with_base_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_scopes.add(scopes);
        self
    }

    pub fn scope_appender(&self, appender: Arc<dyn ScopeAppender>) {
        self.scope_appenders.write().push(appender);
    }

    pub fn setup_handler(&self, handler: Arc<dyn SetupHandler>) {
        self.setup_handlers.write().push(handler);
    }

    pub fn setup_handler_count(&self) -> usize {
        self.setup_handlers.read().len()
    }

    /// Authenticated HTTP client for calls made on behalf of the token's owner.
    pub fn client(&self, token: &OAuthToken) -> Result<reqwest::Client, AdminAppError> {
        self.client_factory.client(token)
    }

    /// Collect the scopes to request when starting authorization.
    pub fn requested_scopes(&self, ctx: &RequestContext) -> Result<Scopes, AdminAppError> {
        let mut scopes = self.base_scopes.clone();
        let appenders = self.scope_appenders.read().clone();
        for appender in appenders {
            appender.append_scopes(self, &mut scopes, ctx)?;
        }
        Ok(scopes)
    }

    /// Run every setup handler, in registration order, with a freshly
    /// obtained domain token. Stops at the first failing handler.
    pub async fn complete_authorization(
        &self,
        token: DomainToken,
        ctx: &RequestContext,
    ) -> Result<(), AdminAppError> {
        let handlers = self.setup_handlers.read().clone();
        tracing::info!(
            site = %ctx.site,
            domain = %token.domain,
            handlers = handlers.len(),
            "Domain authorization complete, running setup handlers"
        );
        for handler in handlers {
            handler.setup(self, &token, ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct StaticScopes(&'static [&'static str]);

    impl ScopeAppender for StaticScopes {
        fn append_scopes(
            &self,
            _app: &AdminApp,
            scopes: &mut Scopes,
            _ctx: &RequestContext,
        ) -> Result<(), AdminAppError> {
            scopes.add(self.0.iter().copied());
            Ok(())
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl SetupHandler for CountingHandler {
        async fn setup(
            &self,
            _app: &AdminApp,
            token: &DomainToken,
            _ctx: &RequestContext,
        ) -> Result<(), AdminAppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AdminAppError::Setup {
                    domain: token.domain.clone(),
                    source: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn app() -> AdminApp {
        AdminApp::new(Arc::new(BearerClientFactory::default()))
    }

    #[test]
    fn test_requested_scopes_merge_base_and_appended() {
        let app = app().with_base_scopes(["openid"]);
        app.scope_appender(Arc::new(StaticScopes(&["a", "b"])));
        app.scope_appender(Arc::new(StaticScopes(&["b", "c"])));

        let scopes = app.requested_scopes(&RequestContext::new("main")).unwrap();
        assert_eq!(scopes.iter().collect::<Vec<_>>(), ["a", "b", "c", "openid"]);
        assert_eq!(scopes.to_param(), "a b c openid");
    }

    struct RejectingScopes;

    impl ScopeAppender for RejectingScopes {
        fn append_scopes(
            &self,
            _app: &AdminApp,
            _scopes: &mut Scopes,
            _ctx: &RequestContext,
        ) -> Result<(), AdminAppError> {
            Err(AdminAppError::ExpiredToken)
        }
    }

    #[test]
    fn test_requested_scopes_propagates_appender_error() {
        let app = app();
        app.scope_appender(Arc::new(StaticScopes(&["a"])));
        app.scope_appender(Arc::new(RejectingScopes));

        let err = app
            .requested_scopes(&RequestContext::new("main"))
            .unwrap_err();
        match err {
            AdminAppError::ExpiredToken => {}
            AdminAppError::Client(_) | AdminAppError::Setup { .. } => {
                panic!("expected the appender's error, got {err:?}")
            }
        }
    }

    #[tokio::test]
    async fn test_complete_authorization_stops_at_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app();
        app.setup_handler(Arc::new(CountingHandler {
            calls: calls.clone(),
            fail: true,
        }));
        app.setup_handler(Arc::new(CountingHandler {
            calls: calls.clone(),
            fail: false,
        }));

        let token = DomainToken::new("example.com", OAuthToken::bearer("t"));
        let err = app
            .complete_authorization(token, &RequestContext::new("main"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdminAppError::Setup { ref domain, .. } if domain == "example.com"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_complete_authorization_runs_all_handlers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app();
        for _ in 0..3 {
            app.setup_handler(Arc::new(CountingHandler {
                calls: calls.clone(),
                fail: false,
            }));
        }

        let token = DomainToken::new("example.com", OAuthToken::bearer("t"));
        app.complete_authorization(token, &RequestContext::new("main"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(app.setup_handler_count(), 3);
    }
}
