//! Credential verification against the external identity providers.
//!
//! Each provider module converts a provider-specific credential into a
//! [`GenericUserProfile`]; every failure path surfaces as an [`OAuthError`].

pub mod facebook;
pub mod google;
pub mod microsoft;
pub mod signing;
pub mod twitter;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// The underlying cause of a provider being unavailable. Network failure,
/// malformed response, and parse failure are not distinguished further than
/// this, but the cause is kept for server-side diagnostics.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    #[error("provider returned an empty response")]
    EmptyBody,

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("expected exactly one token info entry, got {0}")]
    UnexpectedCount(usize),
}

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("token was rejected by the identity provider")]
    TokenInvalid,

    #[error("token was issued to a different application")]
    WrongApp,

    #[error("token carries no account id")]
    MissingAccountId,

    #[error("Facebook is unavailable")]
    FacebookUnavailable(#[source] TransportError),

    #[error("Google is unavailable")]
    GoogleUnavailable(#[source] TransportError),

    #[error("Microsoft is unavailable")]
    MicrosoftUnavailable(#[source] TransportError),

    #[error("Twitter request token endpoint is unavailable")]
    TwitterRequestTokenUnavailable(#[source] TransportError),

    #[error("Twitter access token endpoint is unavailable")]
    TwitterAccessTokenUnavailable(#[source] TransportError),

    #[error("Twitter profile endpoint is unavailable")]
    TwitterProfileUnavailable(#[source] TransportError),
}

/// The normalized identity shape every verifier produces, independent of
/// provider. Consumed immediately by credential dispatch, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericUserProfile {
    pub account_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emails: Option<Vec<String>>,
}

impl GenericUserProfile {
    /// A profile carrying nothing but the verified account id, as produced by
    /// token introspection paths that never see the user's profile.
    pub fn from_account_id(account_id: impl Into<String>) -> Self {
        Self { account_id: account_id.into(), first_name: None, last_name: None, emails: None }
    }
}

/// Reads a JSON response body, treating non-success statuses and empty bodies
/// as transport failures.
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
    let body = response.error_for_status()?.text().await?;
    if body.is_empty() {
        return Err(TransportError::EmptyBody);
    }
    serde_json::from_str(&body).map_err(|err| TransportError::Decode(err.to_string()))
}

/// Reads a `key=value&key=value` response body into pairs, as returned by the
/// OAuth 1.0a token endpoints.
pub(crate) async fn read_form(response: reqwest::Response) -> Result<Vec<(String, String)>, TransportError> {
    let body = response.error_for_status()?.text().await?;
    if body.is_empty() {
        return Err(TransportError::EmptyBody);
    }
    Ok(url::form_urlencoded::parse(body.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect())
}
