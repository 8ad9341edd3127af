//! Outbound lookups the dispatcher depends on: the registered-application
//! table and the user directory. Persistent storage lives elsewhere; these
//! traits are its seam.

use std::collections::HashMap;

use app_core::config::{AppSettings, ClientCredentials};
use app_core::error::AppError;
use app_core::principal::IdentityProvider;
use async_trait::async_trait;

/// A registered tenant application and the client credentials it holds with
/// each provider it supports.
#[derive(Debug, Clone)]
pub struct RegisteredApp {
    pub app_handle: String,
    pub app_key: String,
    pub facebook: Option<ClientCredentials>,
    pub google: Option<ClientCredentials>,
    pub microsoft: Option<ClientCredentials>,
    pub twitter: Option<ClientCredentials>,
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AppRegistry: Send + Sync {
    async fn find_by_app_key(&self, app_key: &str) -> Result<Option<RegisteredApp>, AppError>;
}

/// Maps a verified provider account id to the internal user handle, when one
/// exists. A missing mapping means the caller is mid-registration.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserDirectory: Send + Sync {
    async fn find_user_handle(
        &self,
        provider: IdentityProvider,
        account_id: &str,
    ) -> Result<Option<String>, AppError>;
}

/// Config-seeded registry, sufficient until a persistent store is wired in.
pub struct InMemoryAppRegistry {
    apps: HashMap<String, RegisteredApp>,
}

impl InMemoryAppRegistry {
    pub fn from_settings(apps: &[AppSettings]) -> Self {
        let apps = apps
            .iter()
            .map(|app| {
                let registered = RegisteredApp {
                    app_handle: app.app_handle.clone(),
                    app_key: app.app_key.clone(),
                    facebook: app.facebook.clone(),
                    google: app.google.clone(),
                    microsoft: app.microsoft.clone(),
                    twitter: app.twitter.clone(),
                };
                (app.app_key.clone(), registered)
            })
            .collect();

        Self { apps }
    }
}

#[async_trait]
impl AppRegistry for InMemoryAppRegistry {
    async fn find_by_app_key(&self, app_key: &str) -> Result<Option<RegisteredApp>, AppError> {
        Ok(self.apps.get(app_key).cloned())
    }
}

/// In-memory directory keyed by provider and account id.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    mappings: HashMap<(IdentityProvider, String), String>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        provider: IdentityProvider,
        account_id: impl Into<String>,
        user_handle: impl Into<String>,
    ) {
        self.mappings.insert((provider, account_id.into()), user_handle.into());
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user_handle(
        &self,
        provider: IdentityProvider,
        account_id: &str,
    ) -> Result<Option<String>, AppError> {
        Ok(self.mappings.get(&(provider, account_id.to_string())).cloned())
    }
}
