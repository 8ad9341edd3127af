//! Twitter credential verification via the 3-legged OAuth 1.0a flow.
//!
//! Every leg carries its own unavailability code so operators can tell from
//! the logs which exchange failed.

use chrono::Utc;
use reqwest::header;
use serde::Deserialize;
use uuid::Uuid;

use super::signing::{OAuthRequest, RequestSigner};
use super::{GenericUserProfile, OAuthError, TransportError, read_form, read_json};

pub const DEFAULT_REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";
pub const DEFAULT_ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";
pub const DEFAULT_VERIFY_CREDENTIALS_URL: &str = "https://api.twitter.com/1.1/account/verify_credentials.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterEndpoints {
    pub request_token_url: String,
    pub access_token_url: String,
    pub verify_credentials_url: String,
}

impl Default for TwitterEndpoints {
    fn default() -> Self {
        Self {
            request_token_url: DEFAULT_REQUEST_TOKEN_URL.to_string(),
            access_token_url: DEFAULT_ACCESS_TOKEN_URL.to_string(),
            verify_credentials_url: DEFAULT_VERIFY_CREDENTIALS_URL.to_string(),
        }
    }
}

/// Token pair returned by the access-token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

/// Profile shape returned by the verify-credentials endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterProfile {
    pub id_str: String,
    pub name: Option<String>,
    pub screen_name: Option<String>,
    pub email: Option<String>,
}

impl TwitterProfile {
    /// The provider exposes a single display name, which lands in the first
    /// name slot of the generic profile.
    pub fn to_generic(&self) -> GenericUserProfile {
        GenericUserProfile {
            account_id: self.id_str.clone(),
            first_name: self.name.clone(),
            last_name: None,
            emails: self.email.clone().map(|email| vec![email]),
        }
    }
}

pub struct TwitterVerifier {
    http: reqwest::Client,
    endpoints: TwitterEndpoints,
}

impl TwitterVerifier {
    pub fn new(http: reqwest::Client, endpoints: TwitterEndpoints) -> Self {
        Self { http, endpoints }
    }

    /// Leg one: obtains a request token with an app-signed call. The signing
    /// key has no token component yet.
    pub async fn request_token(&self, consumer_key: &str, consumer_secret: &str) -> Result<String, OAuthError> {
        let signer = RequestSigner::new(consumer_key, consumer_secret);
        let request = OAuthRequest {
            method: "POST",
            url: &self.endpoints.request_token_url,
            ..OAuthRequest::default()
        };
        let authorization = signer.authorization_header(&request, &nonce(), unix_timestamp());

        let response = self
            .http
            .post(&self.endpoints.request_token_url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| OAuthError::TwitterRequestTokenUnavailable(err.into()))?;

        let fields = read_form(response).await.map_err(OAuthError::TwitterRequestTokenUnavailable)?;
        form_value(&fields, "oauth_token").ok_or_else(|| {
            OAuthError::TwitterRequestTokenUnavailable(TransportError::Decode("missing oauth_token".to_string()))
        })
    }

    /// Leg two: exchanges a request token plus the out-of-band verifier for
    /// an access token. The request token doubles as the token component of
    /// the signing key.
    pub async fn access_token(
        &self,
        consumer_key: &str,
        consumer_secret: &str,
        request_token: &str,
        verifier: &str,
    ) -> Result<AccessToken, OAuthError> {
        let signer = RequestSigner::new(consumer_key, consumer_secret);
        let request = OAuthRequest {
            method: "POST",
            url: &self.endpoints.access_token_url,
            token: Some(request_token),
            verifier: Some(verifier),
            signing_token: Some(request_token),
            ..OAuthRequest::default()
        };
        let authorization = signer.authorization_header(&request, &nonce(), unix_timestamp());

        let response = self
            .http
            .post(&self.endpoints.access_token_url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| OAuthError::TwitterAccessTokenUnavailable(err.into()))?;

        let fields = read_form(response).await.map_err(OAuthError::TwitterAccessTokenUnavailable)?;
        match (form_value(&fields, "oauth_token"), form_value(&fields, "oauth_token_secret")) {
            (Some(token), Some(secret)) => Ok(AccessToken { token, secret }),
            _ => Err(OAuthError::TwitterAccessTokenUnavailable(TransportError::Decode(
                "missing oauth_token or oauth_token_secret".to_string(),
            ))),
        }
    }

    /// Leg three: fetches the caller's profile with a call signed by the
    /// access token and its secret.
    pub async fn verify_credentials(
        &self,
        consumer_key: &str,
        consumer_secret: &str,
        access: &AccessToken,
    ) -> Result<TwitterProfile, OAuthError> {
        let signer = RequestSigner::new(consumer_key, consumer_secret);
        let request = OAuthRequest {
            method: "GET",
            url: &self.endpoints.verify_credentials_url,
            token: Some(&access.token),
            signing_token: Some(&access.secret),
            ..OAuthRequest::default()
        };
        let authorization = signer.authorization_header(&request, &nonce(), unix_timestamp());

        let response = self
            .http
            .get(&self.endpoints.verify_credentials_url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|err| OAuthError::TwitterProfileUnavailable(err.into()))?;

        read_json(response).await.map_err(OAuthError::TwitterProfileUnavailable)
    }

    /// Runs legs two and three for a caller that already holds a request
    /// token and verifier, producing the normalized profile.
    pub async fn verify(
        &self,
        consumer_key: &str,
        consumer_secret: &str,
        request_token: &str,
        verifier: &str,
    ) -> Result<GenericUserProfile, OAuthError> {
        let access = self.access_token(consumer_key, consumer_secret, request_token, verifier).await?;
        let profile = self.verify_credentials(consumer_key, consumer_secret, &access).await?;
        Ok(profile.to_generic())
    }
}

fn form_value(fields: &[(String, String)], name: &str) -> Option<String> {
    fields.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
}

fn nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

fn unix_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
