//! OAuth 1.0a request signing with HMAC-SHA1.
//!
//! The percent-encoding rules, parameter ordering, and base-string layout
//! here must stay byte-compatible with RFC 5849; any deviation breaks the
//! provider's signature check.

use base64::Engine;
use base64::engine::general_purpose;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;

/// RFC 5849 §3.6: everything except ALPHA, DIGIT, `-`, `.`, `_` and `~` is
/// percent-encoded, uppercase hex, UTF-8 bytes for non-ASCII input.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// One outbound request to be signed. `signing_token` is the token component
/// of the signing key: absent for the request-token leg, the request token
/// for the access-token exchange, the token secret for resource calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OAuthRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub token: Option<&'a str>,
    pub verifier: Option<&'a str>,
    pub signing_token: Option<&'a str>,
    pub extra_params: &'a [(&'a str, &'a str)],
}

pub struct RequestSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl RequestSigner {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self { consumer_key: consumer_key.into(), consumer_secret: consumer_secret.into() }
    }

    /// Builds the `Authorization: OAuth ...` header value for a request,
    /// signing with the given nonce and timestamp. Nonce and timestamp are
    /// passed in rather than generated so signatures are reproducible.
    pub fn authorization_header(&self, request: &OAuthRequest<'_>, nonce: &str, timestamp: u64) -> String {
        let timestamp = timestamp.to_string();
        let mut oauth_params: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", &self.consumer_key),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", &timestamp),
            ("oauth_version", "1.0"),
        ];
        if let Some(token) = request.token {
            oauth_params.push(("oauth_token", token));
        }
        if let Some(verifier) = request.verifier {
            oauth_params.push(("oauth_verifier", verifier));
        }

        let mut signed_params: Vec<(&str, &str)> = oauth_params.clone();
        signed_params.extend(request.extra_params.iter().copied());

        let base = signature_base_string(request.method, request.url, &signed_params);
        let key = self.signing_key(request.signing_token);
        let signature = hmac_sha1(&base, &key);

        oauth_params.push(("oauth_signature", &signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(name, value)| format!("{}=\"{}\"", name, percent_encode(value)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    /// The signing key is the consumer secret and the token component joined
    /// by `&`, with the token component percent-encoded.
    fn signing_key(&self, signing_token: Option<&str>) -> String {
        format!(
            "{}&{}",
            self.consumer_secret,
            signing_token.map(percent_encode).unwrap_or_default()
        )
    }
}

/// Canonical signature base string: uppercase method, encoded URL, and the
/// encoded-then-sorted parameter string, joined by `&`.
fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (percent_encode(name), percent_encode(value)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    )
}

fn hmac_sha1(base: &str, key: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).unwrap();
    mac.update(base.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The provider's published signing example, reproduced byte for byte.
    const CONSUMER_KEY: &str = "xvz1evFS4wEEPTGEFPHBog";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN: &str = "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: u64 = 1318622958;

    fn example_request<'a>(extra_params: &'a [(&'a str, &'a str)]) -> OAuthRequest<'a> {
        OAuthRequest {
            method: "POST",
            url: "https://api.twitter.com/1.1/statuses/update.json",
            token: Some(TOKEN),
            verifier: None,
            signing_token: Some(TOKEN_SECRET),
            extra_params,
        }
    }

    #[test]
    fn test_percent_encoding_rules() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
        assert_eq!(percent_encode("unreserved-._~"), "unreserved-._~");
    }

    #[test]
    fn test_signature_base_string_matches_known_vector() {
        let extra = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", CONSUMER_KEY),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", TOKEN),
            ("oauth_version", "1.0"),
        ];

        let base = signature_base_string("post", "https://api.twitter.com/1.1/statuses/update.json", &extra);

        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&\
             include_entities%3Dtrue%26\
             oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26\
             oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26\
             oauth_signature_method%3DHMAC-SHA1%26\
             oauth_timestamp%3D1318622958%26\
             oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26\
             oauth_version%3D1.0%26\
             status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        );
    }

    #[test]
    fn test_authorization_header_matches_known_signature() {
        let extra = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
        ];
        let signer = RequestSigner::new(CONSUMER_KEY, CONSUMER_SECRET);

        let header = signer.authorization_header(&example_request(&extra), NONCE, TIMESTAMP);

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"tnnArxj06cWHq44gCs1OSKk%2FjLY%3D\""));
        assert!(header.contains(&format!("oauth_consumer_key=\"{CONSUMER_KEY}\"")));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_timestamp=\"1318622958\""));
        assert!(header.contains(&format!("oauth_token=\"{TOKEN}\"")));
        assert!(header.contains("oauth_version=\"1.0\""));
        // Request parameters are signed but never placed in the header.
        assert!(!header.contains("status"));
        assert!(!header.contains("include_entities"));
    }

    #[test]
    fn test_request_token_leg_signs_with_bare_ampersand_key() {
        let signer = RequestSigner::new("ck", "cs");
        assert_eq!(signer.signing_key(None), "cs&");
        assert_eq!(signer.signing_key(Some("req token")), "cs&req%20token");
    }

    #[test]
    fn test_verifier_parameter_is_signed_and_sent() {
        let signer = RequestSigner::new("ck", "cs");
        let request = OAuthRequest {
            method: "POST",
            url: "https://api.twitter.com/oauth/access_token",
            token: Some("req-token"),
            verifier: Some("pin-1234"),
            signing_token: Some("req-token"),
            extra_params: &[],
        };

        let header = signer.authorization_header(&request, "nonce", 1318622958);

        assert!(header.contains("oauth_verifier=\"pin-1234\""));
        assert!(header.contains("oauth_token=\"req-token\""));
    }
}
