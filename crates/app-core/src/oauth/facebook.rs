//! Facebook credential verification via the Graph API.

use chrono::Utc;
use serde::Deserialize;

use super::{GenericUserProfile, OAuthError, TransportError, read_json};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Profile shape returned by the `me` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl FacebookProfile {
    pub fn to_generic(&self) -> GenericUserProfile {
        GenericUserProfile {
            account_id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            emails: self.email.clone().map(|email| vec![email]),
        }
    }
}

/// One token introspection entry from the `debug_token` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugTokenInfo {
    pub is_valid: bool,
    pub app_id: String,
    /// Expiry in epoch seconds.
    pub expires_at: i64,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DebugTokenResponse {
    data: Vec<DebugTokenInfo>,
}

/// First page of the caller's friends who also use the app.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendsPage {
    pub data: Vec<FacebookProfile>,
    pub summary: Option<FriendsSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendsSummary {
    pub total_count: u64,
}

pub struct FacebookVerifier {
    http: reqwest::Client,
    graph_url: String,
}

impl FacebookVerifier {
    pub fn new(http: reqwest::Client, graph_url: impl Into<String>) -> Self {
        Self { http, graph_url: graph_url.into() }
    }

    /// Introspects a user access token with app-level credentials and returns
    /// the profile of the token's subject. The response must contain exactly
    /// one introspection entry; anything else is a provider failure, not a
    /// credential failure.
    pub async fn verify_token(
        &self,
        user_token: &str,
        app_id: &str,
        app_secret: &str,
    ) -> Result<GenericUserProfile, OAuthError> {
        let app_token = format!("{app_id}|{app_secret}");
        let response = self
            .http
            .get(format!("{}/debug_token", self.graph_url))
            .query(&[("input_token", user_token), ("access_token", &app_token)])
            .send()
            .await
            .map_err(|err| OAuthError::FacebookUnavailable(err.into()))?;

        let body: DebugTokenResponse = read_json(response).await.map_err(OAuthError::FacebookUnavailable)?;
        if body.data.len() != 1 {
            return Err(OAuthError::FacebookUnavailable(TransportError::UnexpectedCount(body.data.len())));
        }

        let account_id = validate_debug_token(&body.data[0], app_id)?;
        Ok(GenericUserProfile::from_account_id(account_id))
    }

    /// Fetches the caller's own profile with the user token as bearer.
    pub async fn implicit_profile(&self, user_token: &str) -> Result<FacebookProfile, OAuthError> {
        let response = self
            .http
            .get(format!("{}/me", self.graph_url))
            .bearer_auth(user_token)
            .send()
            .await
            .map_err(|err| OAuthError::FacebookUnavailable(err.into()))?;

        read_json(response).await.map_err(OAuthError::FacebookUnavailable)
    }

    /// Fetches the caller's friends who also use this app. Returns the first
    /// page only; paging links in the response are not followed.
    pub async fn friends(&self, user_token: &str) -> Result<FriendsPage, OAuthError> {
        let response = self
            .http
            .get(format!("{}/me/friends", self.graph_url))
            .query(&[("summary", "total_count")])
            .bearer_auth(user_token)
            .send()
            .await
            .map_err(|err| OAuthError::FacebookUnavailable(err.into()))?;

        read_json(response).await.map_err(OAuthError::FacebookUnavailable)
    }
}

/// Applies the introspection checks in order, stopping at the first failure:
/// provider validity, owning app, expiry, then subject presence. Later checks
/// assume the earlier ones passed.
fn validate_debug_token(info: &DebugTokenInfo, app_id: &str) -> Result<String, OAuthError> {
    if !info.is_valid {
        return Err(OAuthError::TokenInvalid);
    }
    if info.app_id != app_id {
        return Err(OAuthError::WrongApp);
    }
    if info.expires_at <= Utc::now().timestamp() {
        return Err(OAuthError::TokenExpired);
    }
    match info.user_id.as_deref() {
        Some(user_id) if !user_id.is_empty() => Ok(user_id.to_string()),
        _ => Err(OAuthError::MissingAccountId),
    }
}
