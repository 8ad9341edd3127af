//! Google credential verification with lazily discovered endpoints.

use serde::Deserialize;
use tokio::sync::OnceCell;

use super::{GenericUserProfile, OAuthError, read_json};

pub const DEFAULT_DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";

/// The provider-published OpenID discovery document. Fetched at most once per
/// verifier lifetime and never refreshed.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
}

/// Profile shape returned by the discovered userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    #[serde(alias = "sub")]
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
}

impl GoogleProfile {
    pub fn to_generic(&self) -> GenericUserProfile {
        GenericUserProfile {
            account_id: self.id.clone(),
            first_name: self.given_name.clone(),
            last_name: self.family_name.clone(),
            emails: self.email.clone().map(|email| vec![email]),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

pub struct GoogleVerifier {
    http: reqwest::Client,
    discovery_url: String,
    discovery: OnceCell<DiscoveryDocument>,
}

impl GoogleVerifier {
    pub fn new(http: reqwest::Client, discovery_url: impl Into<String>) -> Self {
        Self { http, discovery_url: discovery_url.into(), discovery: OnceCell::new() }
    }

    /// Returns the cached discovery document, fetching it on first use.
    ///
    /// The cell guarantees a single in-flight fetch: the first caller runs the
    /// request and every concurrent caller awaits the same result. A failed
    /// fetch is reported to all current waiters and leaves the cell empty, so
    /// a later request may re-attempt the bootstrap.
    async fn discovery(&self) -> Result<&DiscoveryDocument, OAuthError> {
        self.discovery
            .get_or_try_init(|| async {
                tracing::info!(url = %self.discovery_url, "fetching OpenID discovery document");
                let response = self
                    .http
                    .get(&self.discovery_url)
                    .send()
                    .await
                    .map_err(|err| OAuthError::GoogleUnavailable(err.into()))?;
                read_json(response).await.map_err(OAuthError::GoogleUnavailable)
            })
            .await
    }

    /// Implicit flow: the caller already holds an access token.
    pub async fn implicit_profile(&self, access_token: &str) -> Result<GoogleProfile, OAuthError> {
        let userinfo_endpoint = self.discovery().await?.userinfo_endpoint.clone();
        let response = self
            .http
            .get(userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| OAuthError::GoogleUnavailable(err.into()))?;

        read_json(response).await.map_err(OAuthError::GoogleUnavailable)
    }

    /// Authorization-code flow: exchanges the code at the discovered token
    /// endpoint, then continues through the implicit path with the returned
    /// access token.
    pub async fn code_profile(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<GoogleProfile, OAuthError> {
        let token_endpoint = self.discovery().await?.token_endpoint.clone();
        let params = [
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .http
            .post(token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|err| OAuthError::GoogleUnavailable(err.into()))?;

        let exchanged: TokenExchangeResponse = read_json(response).await.map_err(OAuthError::GoogleUnavailable)?;
        self.implicit_profile(&exchanged.access_token).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::oauth::TransportError;

    fn discovery_body(server: &MockServer) -> serde_json::Value {
        json!({
            "issuer": "https://accounts.google.com",
            "authorization_endpoint": format!("{}/o/oauth2/v2/auth", server.base_url()),
            "token_endpoint": format!("{}/token", server.base_url()),
            "userinfo_endpoint": format!("{}/userinfo", server.base_url()),
        })
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_fetch_discovery_once() {
        let server = MockServer::start_async().await;
        let body = discovery_body(&server);
        let discovery = server
            .mock_async(move |when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).json_body(body);
            })
            .await;
        let userinfo = server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo");
                then.status(200).json_body(json!({"id": "g-1", "email": "g@example.com"}));
            })
            .await;

        let verifier = Arc::new(GoogleVerifier::new(
            reqwest::Client::new(),
            format!("{}/.well-known/openid-configuration", server.base_url()),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let verifier = verifier.clone();
                tokio::spawn(async move { verifier.implicit_profile("token").await })
            })
            .collect();

        for handle in handles {
            let profile = handle.await.unwrap().unwrap();
            assert_eq!(profile.id, "g-1");
        }

        discovery.assert_hits_async(1).await;
        userinfo.assert_hits_async(8).await;
    }

    #[tokio::test]
    async fn test_failed_bootstrap_propagates_and_can_retry() {
        let server = MockServer::start_async().await;
        let mut broken = server
            .mock_async(|when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(503);
            })
            .await;

        let verifier = GoogleVerifier::new(
            reqwest::Client::new(),
            format!("{}/.well-known/openid-configuration", server.base_url()),
        );

        let result = verifier.implicit_profile("token").await;
        assert!(matches!(result, Err(OAuthError::GoogleUnavailable(_))));

        // Once the provider recovers, a later request bootstraps successfully.
        broken.delete_async().await;
        let body = discovery_body(&server);
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).json_body(body);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo");
                then.status(200).json_body(json!({"id": "g-1"}));
            })
            .await;

        let profile = verifier.implicit_profile("token").await.unwrap();
        assert_eq!(profile.id, "g-1");
    }

    #[tokio::test]
    async fn test_code_flow_exchanges_then_fetches_profile() {
        let server = MockServer::start_async().await;
        let body = discovery_body(&server);
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).json_body(body);
            })
            .await;
        let token = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_includes("grant_type=authorization_code")
                    .body_includes("code=the-code")
                    .body_includes("client_id=client-1");
                then.status(200).json_body(json!({"access_token": "exchanged-token"}));
            })
            .await;
        let userinfo = server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo").header("authorization", "Bearer exchanged-token");
                then.status(200)
                    .json_body(json!({"id": "g-2", "given_name": "Grace", "family_name": "Hopper"}));
            })
            .await;

        let verifier = GoogleVerifier::new(
            reqwest::Client::new(),
            format!("{}/.well-known/openid-configuration", server.base_url()),
        );
        let profile = verifier
            .code_profile("the-code", "client-1", "secret-1", "https://example.com/callback")
            .await
            .unwrap();

        token.assert_async().await;
        userinfo.assert_async().await;
        assert_eq!(profile.to_generic().first_name.as_deref(), Some("Grace"));
    }

    #[tokio::test]
    async fn test_empty_userinfo_body_is_service_failure() {
        let server = MockServer::start_async().await;
        let body = discovery_body(&server);
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/.well-known/openid-configuration");
                then.status(200).json_body(body);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/userinfo");
                then.status(200).body("");
            })
            .await;

        let verifier = GoogleVerifier::new(
            reqwest::Client::new(),
            format!("{}/.well-known/openid-configuration", server.base_url()),
        );
        let result = verifier.implicit_profile("token").await;

        assert!(matches!(
            result,
            Err(OAuthError::GoogleUnavailable(TransportError::EmptyBody))
        ));
    }
}
