use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// OAuth credential obtained for a domain's admin.
#[derive(Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A token scoped to one hosted domain, handed to setup handlers once
/// authorization for that domain completes.
#[derive(Debug, Clone)]
pub struct DomainToken {
    pub domain: String,
    pub token: OAuthToken,
}

impl DomainToken {
    pub fn new(domain: impl Into<String>, token: OAuthToken) -> Self {
        Self {
            domain: domain.into(),
            token,
        }
    }
}

/// The request that triggered authorization, used for log context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub site: String,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            request_id: Uuid::new_v4(),
        }
    }
}
