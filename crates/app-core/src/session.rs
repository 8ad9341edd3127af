//! The service's own session tokens, consumed by the internal scheme.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::principal::IdentityProvider;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session token has expired")]
    Expired,

    #[error("session token is invalid")]
    Invalid,

    #[error("failed to issue session token")]
    Creation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Internal user handle.
    pub sub: String,
    /// Identity provider the user registered through.
    pub idp: IdentityProvider,
    /// That provider's account id for the user.
    pub act: String,
    pub jti: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
}

/// The identity a validated session token vouches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_handle: String,
    pub identity_provider: IdentityProvider,
    pub account_id: String,
}

/// Issues and validates the internal session tokens. Rotation and refresh
/// policy live with the callers of `issue`, not here.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionTokenService: Send + Sync {
    fn issue(&self, identity: &SessionIdentity) -> Result<String, SessionError>;
    fn validate(&self, token: &str) -> Result<SessionIdentity, SessionError>;
}

pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub expiration_secs: i64,
}

pub struct JwtSessionService {
    config: SessionConfig,
}

impl JwtSessionService {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl SessionTokenService for JwtSessionService {
    fn issue(&self, identity: &SessionIdentity) -> Result<String, SessionError> {
        let now = Utc::now();
        let exp = (now + Duration::seconds(self.config.expiration_secs)).timestamp() as usize;

        let claims = SessionClaims {
            sub: identity.user_handle.clone(),
            idp: identity.identity_provider,
            act: identity.account_id.clone(),
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer.clone(),
            exp,
            iat: now.timestamp() as usize,
        };

        let header = Header::new(Algorithm::HS512);
        encode(&header, &claims, &EncodingKey::from_secret(self.config.secret.as_ref()))
            .map_err(|_| SessionError::Creation)
    }

    fn validate(&self, token: &str) -> Result<SessionIdentity, SessionError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_issuer(&[&self.config.issuer]);

        decode::<SessionClaims>(token, &DecodingKey::from_secret(self.config.secret.as_ref()), &validation)
            .map(|data| SessionIdentity {
                user_handle: data.claims.sub,
                identity_provider: data.claims.idp,
                account_id: data.claims.act,
            })
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid,
            })
    }
}
