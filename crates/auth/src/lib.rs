//! Scheme-dispatch authentication: wires the provider verifiers, the session
//! token service, and the outbound lookups into a single authenticator the
//! gatekeeper middleware can call.

mod domain;
mod outbound;
mod usecase;

use std::sync::Arc;

use app_core::config::Settings;
use app_core::middleware::CredentialAuthenticator;
use app_core::oauth::facebook::FacebookVerifier;
use app_core::oauth::google::GoogleVerifier;
use app_core::oauth::microsoft::MicrosoftVerifier;
use app_core::oauth::twitter::{TwitterEndpoints, TwitterVerifier};
use app_core::session::SessionTokenService;
pub use domain::entity::credentials::Credentials;
pub use domain::entity::scheme::{AuthScheme, UnknownScheme};
pub use outbound::registry::{
    AppRegistry, InMemoryAppRegistry, InMemoryUserDirectory, RegisteredApp, UserDirectory,
};
pub use usecase::authn::SchemeAuthenticator;

pub struct Dependency {
    pub settings: Arc<Settings>,
    pub http: reqwest::Client,
    pub session: Arc<dyn SessionTokenService>,
    pub registry: Arc<dyn AppRegistry>,
    pub directory: Arc<dyn UserDirectory>,
}

pub fn new(dep: Dependency) -> Arc<dyn CredentialAuthenticator> {
    let endpoints = &dep.settings.providers;

    Arc::new(SchemeAuthenticator::new(
        dep.registry,
        dep.directory,
        dep.session,
        FacebookVerifier::new(dep.http.clone(), endpoints.facebook_graph_url.clone()),
        GoogleVerifier::new(dep.http.clone(), endpoints.google_discovery_url.clone()),
        MicrosoftVerifier::new(dep.http.clone(), endpoints.microsoft_profile_url.clone()),
        TwitterVerifier::new(
            dep.http,
            TwitterEndpoints {
                request_token_url: endpoints.twitter_request_token_url.clone(),
                access_token_url: endpoints.twitter_access_token_url.clone(),
                verify_credentials_url: endpoints.twitter_verify_credentials_url.clone(),
            },
        ),
    ))
}
