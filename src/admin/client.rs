use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::{AdminAppError, OAuthToken};

/// Builds HTTP clients that authenticate as a domain's admin.
pub trait ClientFactory: Send + Sync {
    fn client(&self, token: &OAuthToken) -> Result<reqwest::Client, AdminAppError>;
}

/// Client factory sending the token as an `Authorization` header on every
/// request.
#[derive(Debug, Clone)]
pub struct BearerClientFactory {
    timeout: Duration,
}

impl BearerClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for BearerClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ClientFactory for BearerClientFactory {
    fn client(&self, token: &OAuthToken) -> Result<reqwest::Client, AdminAppError> {
        if token.is_expired() {
            return Err(AdminAppError::ExpiredToken);
        }

        let mut auth = HeaderValue::from_str(&format!(
            "{} {}",
            token.token_type, token.access_token
        ))
        .map_err(|e| AdminAppError::Client(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| AdminAppError::Client(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    #[tokio::test]
    async fn test_client_sends_bearer_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = BearerClientFactory::default()
            .client(&OAuthToken::bearer("ya29.token"))
            .unwrap();
        let response = client
            .get(format!("{}/ping", mock_server.uri()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut token = OAuthToken::bearer("ya29.token");
        token.expires_at = Some(Utc::now() - ChronoDuration::minutes(1));

        let err = BearerClientFactory::default().client(&token).unwrap_err();
        assert!(matches!(err, AdminAppError::ExpiredToken));
    }

    #[test]
    fn test_token_with_newline_rejected() {
        let err = BearerClientFactory::default()
            .client(&OAuthToken::bearer("bad\ntoken"))
            .unwrap_err();
        assert!(matches!(err, AdminAppError::Client(_)));
    }
}
