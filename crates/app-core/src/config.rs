//! Typed application settings loaded through the configuration layer.

use std::path::Path;

use config::{Config as RawConfig, File};
use serde::Deserialize;
use thiserror::Error;

use super::oauth::{facebook, google, microsoft, twitter};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load or parse configuration")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub session: SessionSettings,
    #[serde(default)]
    pub providers: ProviderEndpoints,
    /// Registered tenant applications, keyed by app key at lookup time.
    #[serde(default)]
    pub apps: Vec<AppSettings>,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = RawConfig::builder().add_source(File::from(path.as_ref()).required(true)).build()?;
        Ok(raw.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub address: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub secret: String,
    pub issuer: String,
    pub expiration_secs: i64,
}

/// Provider endpoint URLs. The defaults point at the real providers; tests
/// and private deployments override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub facebook_graph_url: String,
    pub google_discovery_url: String,
    pub microsoft_profile_url: String,
    pub twitter_request_token_url: String,
    pub twitter_access_token_url: String,
    pub twitter_verify_credentials_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            facebook_graph_url: facebook::DEFAULT_GRAPH_URL.to_string(),
            google_discovery_url: google::DEFAULT_DISCOVERY_URL.to_string(),
            microsoft_profile_url: microsoft::DEFAULT_PROFILE_URL.to_string(),
            twitter_request_token_url: twitter::DEFAULT_REQUEST_TOKEN_URL.to_string(),
            twitter_access_token_url: twitter::DEFAULT_ACCESS_TOKEN_URL.to_string(),
            twitter_verify_credentials_url: twitter::DEFAULT_VERIFY_CREDENTIALS_URL.to_string(),
        }
    }
}

/// One registered application and the client credentials it holds with each
/// provider it supports.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub app_key: String,
    pub app_handle: String,
    pub facebook: Option<ClientCredentials>,
    pub google: Option<ClientCredentials>,
    pub microsoft: Option<ClientCredentials>,
    pub twitter: Option<ClientCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Failed to create temp file");

        temp_file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        temp_file.flush().expect("Failed to flush temp file");
        temp_file
    }

    #[test]
    fn test_load_full_settings() {
        let content = r#"
            server:
                address: "127.0.0.1:8080"
                timeout_secs: 10
            session:
                secret: "session-secret"
                issuer: "test-issuer"
                expiration_secs: 3600
            providers:
                facebook_graph_url: "http://localhost:9000"
            apps:
                - app_key: "key-1"
                  app_handle: "handle-1"
                  facebook:
                      client_id: "fb-client"
                      client_secret: "fb-secret"
        "#;

        let settings = Settings::load(create_temp_config(content).path()).unwrap();

        assert_eq!(settings.server.address, "127.0.0.1:8080");
        assert_eq!(settings.server.timeout_secs, 10);
        assert_eq!(settings.session.issuer, "test-issuer");
        assert_eq!(settings.providers.facebook_graph_url, "http://localhost:9000");
        // Unset endpoints keep their real-provider defaults.
        assert_eq!(settings.providers.google_discovery_url, google::DEFAULT_DISCOVERY_URL);
        assert_eq!(settings.apps.len(), 1);
        assert_eq!(settings.apps[0].facebook.as_ref().unwrap().client_id, "fb-client");
        assert!(settings.apps[0].twitter.is_none());
    }

    #[test]
    fn test_load_minimal_settings() {
        let content = r#"
            server:
                address: "127.0.0.1:8080"
            session:
                secret: "session-secret"
                issuer: "test-issuer"
                expiration_secs: 3600
        "#;

        let settings = Settings::load(create_temp_config(content).path()).unwrap();

        assert_eq!(settings.server.timeout_secs, 30);
        assert!(settings.apps.is_empty());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Settings::load("/nonexistent/path/config.yaml");

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let content = r#"
            server: [not: valid
        "#;

        let result = Settings::load(create_temp_config(content).path());

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
