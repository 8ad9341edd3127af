use std::fmt;
use std::str::FromStr;

use app_core::principal::IdentityProvider;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown authentication scheme: {0}")]
pub struct UnknownScheme(pub String);

/// The closed set of credential schemes accepted in the Authorization header.
/// Dispatch is an exhaustive match over these variants, so adding a scheme
/// forces every call site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    Anonymous,
    SocialPlus,
    Facebook,
    Google,
    Microsoft,
    Twitter,
    Aads2s,
}

impl AuthScheme {
    /// The identity provider a user principal verified under this scheme
    /// carries. Anonymous callers have none.
    pub fn identity_provider(&self) -> Option<IdentityProvider> {
        match self {
            AuthScheme::Anonymous => None,
            AuthScheme::SocialPlus => Some(IdentityProvider::Internal),
            AuthScheme::Facebook => Some(IdentityProvider::Facebook),
            AuthScheme::Google => Some(IdentityProvider::Google),
            AuthScheme::Microsoft => Some(IdentityProvider::Microsoft),
            AuthScheme::Twitter => Some(IdentityProvider::Twitter),
            AuthScheme::Aads2s => Some(IdentityProvider::AadS2s),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthScheme::Anonymous => "Anonymous",
            AuthScheme::SocialPlus => "SocialPlus",
            AuthScheme::Facebook => "Facebook",
            AuthScheme::Google => "Google",
            AuthScheme::Microsoft => "Microsoft",
            AuthScheme::Twitter => "Twitter",
            AuthScheme::Aads2s => "AADS2S",
        };
        f.write_str(name)
    }
}

impl FromStr for AuthScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" => Ok(AuthScheme::Anonymous),
            "socialplus" => Ok(AuthScheme::SocialPlus),
            "facebook" => Ok(AuthScheme::Facebook),
            "google" => Ok(AuthScheme::Google),
            "microsoft" => Ok(AuthScheme::Microsoft),
            "twitter" => Ok(AuthScheme::Twitter),
            "aads2s" => Ok(AuthScheme::Aads2s),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_parsing_is_case_insensitive() {
        assert_eq!("facebook".parse::<AuthScheme>().unwrap(), AuthScheme::Facebook);
        assert_eq!("FACEBOOK".parse::<AuthScheme>().unwrap(), AuthScheme::Facebook);
        assert_eq!("SocialPlus".parse::<AuthScheme>().unwrap(), AuthScheme::SocialPlus);
        assert_eq!("AADS2S".parse::<AuthScheme>().unwrap(), AuthScheme::Aads2s);
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let result = "Kerberos".parse::<AuthScheme>();

        assert_eq!(result.unwrap_err(), UnknownScheme("Kerberos".to_string()));
    }

    #[test]
    fn test_identity_provider_mapping() {
        assert_eq!(AuthScheme::Anonymous.identity_provider(), None);
        assert_eq!(AuthScheme::SocialPlus.identity_provider(), Some(IdentityProvider::Internal));
        assert_eq!(AuthScheme::Twitter.identity_provider(), Some(IdentityProvider::Twitter));
    }
}
