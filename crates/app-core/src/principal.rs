//! Verified principal value types and their compact string encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("serialized app principal must contain two newline-separated parts")]
    MalformedAppPrincipal,

    #[error("serialized user principal must contain exactly three newline-separated parts")]
    MalformedUserPrincipal,

    #[error("unknown identity provider: {0}")]
    UnknownIdentityProvider(String),
}

/// The identity provider a user principal was verified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityProvider {
    Facebook,
    Microsoft,
    Google,
    Twitter,
    #[serde(rename = "AADS2S")]
    AadS2s,
    Internal,
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityProvider::Facebook => "Facebook",
            IdentityProvider::Microsoft => "Microsoft",
            IdentityProvider::Google => "Google",
            IdentityProvider::Twitter => "Twitter",
            IdentityProvider::AadS2s => "AADS2S",
            IdentityProvider::Internal => "Internal",
        };
        f.write_str(name)
    }
}

impl FromStr for IdentityProvider {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Facebook" => Ok(IdentityProvider::Facebook),
            "Microsoft" => Ok(IdentityProvider::Microsoft),
            "Google" => Ok(IdentityProvider::Google),
            "Twitter" => Ok(IdentityProvider::Twitter),
            "AADS2S" => Ok(IdentityProvider::AadS2s),
            "Internal" => Ok(IdentityProvider::Internal),
            other => Err(PrincipalError::UnknownIdentityProvider(other.to_string())),
        }
    }
}

/// A verified application identity.
///
/// Serializes as `app_handle + "\n" + app_key`. Parsing takes the first two
/// newline-separated tokens and ignores anything after a second newline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppPrincipal {
    pub app_handle: String,
    pub app_key: String,
}

impl AppPrincipal {
    pub fn new(app_handle: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self { app_handle: app_handle.into(), app_key: app_key.into() }
    }

    pub fn serialize(&self) -> String {
        format!("{}\n{}", self.app_handle, self.app_key)
    }
}

impl FromStr for AppPrincipal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('\n');
        match (parts.next(), parts.next()) {
            (Some(app_handle), Some(app_key)) => Ok(Self::new(app_handle, app_key)),
            _ => Err(PrincipalError::MalformedAppPrincipal),
        }
    }
}

/// A verified user identity.
///
/// `user_handle` is absent while the caller is mid-registration: the external
/// account has been verified but not yet mapped to an internal handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPrincipal {
    pub user_handle: Option<String>,
    pub identity_provider: IdentityProvider,
    pub identity_provider_account_id: String,
}

impl UserPrincipal {
    pub fn new(
        user_handle: Option<String>,
        identity_provider: IdentityProvider,
        identity_provider_account_id: impl Into<String>,
    ) -> Self {
        Self { user_handle, identity_provider, identity_provider_account_id: identity_provider_account_id.into() }
    }

    /// Serializes as three newline-separated parts; an absent user handle
    /// becomes an empty first part.
    pub fn serialize(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.user_handle.as_deref().unwrap_or_default(),
            self.identity_provider,
            self.identity_provider_account_id
        )
    }
}

impl FromStr for UserPrincipal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('\n').collect();
        if parts.len() != 3 {
            return Err(PrincipalError::MalformedUserPrincipal);
        }

        let user_handle = if parts[0].is_empty() { None } else { Some(parts[0].to_string()) };

        Ok(Self::new(user_handle, parts[1].parse()?, parts[2]))
    }
}

/// Either kind of verified principal, as produced by credential dispatch and
/// installed into request state by the gatekeeper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    App(AppPrincipal),
    User(UserPrincipal),
}
