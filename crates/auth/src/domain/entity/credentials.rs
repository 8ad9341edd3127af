/// The parsed `KEY=value` credentials list carried after the scheme name in
/// the Authorization header. Entries are separated by `|` or `,`; unknown
/// keys are ignored and a repeated key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// `AK`, the tenant application key.
    pub app_key: Option<String>,
    /// `TK`, the scheme's token: an access token, a session token, or the
    /// out-of-band verifier when a request token is present.
    pub token: Option<String>,
    /// `UH`, a user handle hint supplied by the caller.
    pub user_handle: Option<String>,
    /// `RT`, an OAuth 1.0a request token.
    pub request_token: Option<String>,
}

impl Credentials {
    pub fn parse(input: &str) -> Self {
        let mut credentials = Self::default();

        for entry in input.split(['|', ',']) {
            let Some((key, value)) = entry.split_once('=') else {
                continue;
            };
            let value = value.to_string();
            match key.trim() {
                "AK" => credentials.app_key = Some(value),
                "TK" => credentials.token = Some(value),
                "UH" => credentials.user_handle = Some(value),
                "RT" => credentials.request_token = Some(value),
                _ => {},
            }
        }

        credentials
    }
}
