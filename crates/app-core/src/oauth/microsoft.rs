//! Microsoft account verification: Live profile fetch and signed-token decode.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{GenericUserProfile, OAuthError, read_json};

pub const DEFAULT_PROFILE_URL: &str = "https://apis.live.net/v5.0/me";

/// Profile shape returned by the Live profile endpoint, including the nested
/// contact sub-objects the provider sends.
#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftProfile {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emails: Option<MicrosoftEmails>,
    pub addresses: Option<MicrosoftAddresses>,
    pub phones: Option<MicrosoftPhones>,
    pub work: Option<Vec<MicrosoftWork>>,
}

/// `preferred` duplicates one of the other entries and is not copied into the
/// generic profile.
#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftEmails {
    pub preferred: Option<String>,
    pub account: Option<String>,
    pub personal: Option<String>,
    pub business: Option<String>,
    pub other: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftAddresses {
    pub personal: Option<MicrosoftAddress>,
    pub business: Option<MicrosoftAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftPhones {
    pub personal: Option<String>,
    pub business: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftWork {
    pub employer: Option<MicrosoftNamed>,
    pub position: Option<MicrosoftNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftNamed {
    pub name: Option<String>,
}

impl MicrosoftProfile {
    /// Copies the account, personal, business and other emails, in that
    /// order, into the generic profile.
    pub fn to_generic(&self) -> GenericUserProfile {
        let emails = self.emails.as_ref().map(|emails| {
            [&emails.account, &emails.personal, &emails.business, &emails.other]
                .into_iter()
                .filter_map(|email| email.clone())
                .collect()
        });

        GenericUserProfile {
            account_id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            emails,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthTokenClaims {
    #[serde(rename = "appid")]
    app_id: String,
    uid: String,
}

pub struct MicrosoftVerifier {
    http: reqwest::Client,
    profile_url: String,
}

impl MicrosoftVerifier {
    pub fn new(http: reqwest::Client, profile_url: impl Into<String>) -> Self {
        Self { http, profile_url: profile_url.into() }
    }

    /// Implicit flow: fetches the profile with the access token passed as a
    /// query parameter, which is how this endpoint expects it.
    pub async fn implicit_profile(&self, access_token: &str) -> Result<MicrosoftProfile, OAuthError> {
        let response = self
            .http
            .get(&self.profile_url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|err| OAuthError::MicrosoftUnavailable(err.into()))?;

        read_json(response).await.map_err(OAuthError::MicrosoftUnavailable)
    }

    /// Decodes a signed authentication token issued for single-sign-on.
    ///
    /// Not hardened for production use. The token is an HS256 JWT whose
    /// signing key is derived from the app's client secret; checks run in
    /// order: expiry, owning app, then subject presence. The `uid` it carries
    /// is pairwise per app and will not match the account id the profile
    /// endpoints return for the same user. That is a provider privacy
    /// property, not a mismatch to correct.
    pub fn decode_auth_token(
        &self,
        token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<GenericUserProfile, OAuthError> {
        let key = derive_signing_key(client_secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let data = decode::<AuthTokenClaims>(token, &DecodingKey::from_secret(&key), &validation).map_err(|err| {
            match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => OAuthError::TokenExpired,
                _ => OAuthError::TokenInvalid,
            }
        })?;

        if data.claims.app_id != client_id {
            return Err(OAuthError::WrongApp);
        }
        if data.claims.uid.is_empty() {
            return Err(OAuthError::MissingAccountId);
        }

        Ok(GenericUserProfile::from_account_id(data.claims.uid))
    }
}

/// The provider signs authentication tokens with SHA-256 over the client
/// secret concatenated with the literal `JWTSig`.
fn derive_signing_key(client_secret: &str) -> Vec<u8> {
    Sha256::digest(format!("{client_secret}JWTSig").as_bytes()).to_vec()
}
