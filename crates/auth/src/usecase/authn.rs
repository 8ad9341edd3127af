//! Composite credential authentication: routes a parsed scheme to the right
//! verifier and assembles the request's principals.

use std::sync::Arc;

use app_core::config::ClientCredentials;
use app_core::error::AppError;
use app_core::middleware::CredentialAuthenticator;
use app_core::oauth::GenericUserProfile;
use app_core::oauth::facebook::FacebookVerifier;
use app_core::oauth::google::GoogleVerifier;
use app_core::oauth::microsoft::MicrosoftVerifier;
use app_core::oauth::twitter::TwitterVerifier;
use app_core::principal::{AppPrincipal, IdentityProvider, Principal, UserPrincipal};
use app_core::session::SessionTokenService;
use async_trait::async_trait;

use crate::domain::entity::credentials::Credentials;
use crate::domain::entity::scheme::AuthScheme;
use crate::outbound::registry::{AppRegistry, RegisteredApp, UserDirectory};

pub struct SchemeAuthenticator {
    registry: Arc<dyn AppRegistry>,
    directory: Arc<dyn UserDirectory>,
    session: Arc<dyn SessionTokenService>,
    facebook: FacebookVerifier,
    google: GoogleVerifier,
    microsoft: MicrosoftVerifier,
    twitter: TwitterVerifier,
}

impl SchemeAuthenticator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn AppRegistry>,
        directory: Arc<dyn UserDirectory>,
        session: Arc<dyn SessionTokenService>,
        facebook: FacebookVerifier,
        google: GoogleVerifier,
        microsoft: MicrosoftVerifier,
        twitter: TwitterVerifier,
    ) -> Self {
        Self { registry, directory, session, facebook, google, microsoft, twitter }
    }

    /// Resolves `AK` against the registry. Every scheme identifies the
    /// calling application, anonymous ones included.
    async fn registered_app(&self, credentials: &Credentials) -> Result<RegisteredApp, AppError> {
        let app_key = credentials.app_key.as_deref().ok_or(AppError::Unauthorized)?;
        self.registry.find_by_app_key(app_key).await?.ok_or_else(|| {
            tracing::warn!("unknown app key presented");
            AppError::Unauthorized
        })
    }

    /// The application's client credentials with the given provider. An app
    /// that never registered with the provider cannot authenticate callers
    /// through it.
    fn provider_client(app: &RegisteredApp, provider: IdentityProvider) -> Result<&ClientCredentials, AppError> {
        let client = match provider {
            IdentityProvider::Facebook => app.facebook.as_ref(),
            IdentityProvider::Google => app.google.as_ref(),
            IdentityProvider::Microsoft => app.microsoft.as_ref(),
            IdentityProvider::Twitter => app.twitter.as_ref(),
            IdentityProvider::AadS2s | IdentityProvider::Internal => None,
        };
        client.ok_or_else(|| {
            tracing::warn!(app_handle = %app.app_handle, %provider, "app is not configured for provider");
            AppError::Unauthorized
        })
    }

    /// Builds the user principal for a verified profile, leaving the handle
    /// empty when the account has not finished registration.
    async fn user_principal(
        &self,
        provider: IdentityProvider,
        profile: GenericUserProfile,
    ) -> Result<UserPrincipal, AppError> {
        let user_handle = self.directory.find_user_handle(provider, &profile.account_id).await?;
        Ok(UserPrincipal::new(user_handle, provider, profile.account_id))
    }

    fn app_principal(app: &RegisteredApp) -> Principal {
        Principal::App(AppPrincipal::new(&app.app_handle, &app.app_key))
    }
}

#[async_trait]
impl CredentialAuthenticator for SchemeAuthenticator {
    async fn authenticate(&self, scheme: &str, credentials: &str) -> Result<Vec<Principal>, AppError> {
        let scheme: AuthScheme = scheme.parse().map_err(|_| AppError::Unauthorized)?;
        let credentials = Credentials::parse(credentials);
        let app = self.registered_app(&credentials).await?;

        match scheme {
            AuthScheme::Anonymous => Ok(vec![Self::app_principal(&app)]),

            AuthScheme::SocialPlus => {
                let token = credentials.token.as_deref().ok_or(AppError::Unauthorized)?;
                let identity = self.session.validate(token)?;
                let user = UserPrincipal::new(
                    Some(identity.user_handle),
                    identity.identity_provider,
                    identity.account_id,
                );
                Ok(vec![Self::app_principal(&app), Principal::User(user)])
            },

            AuthScheme::Facebook => {
                let token = credentials.token.as_deref().ok_or(AppError::Unauthorized)?;
                let client = Self::provider_client(&app, IdentityProvider::Facebook)?;
                let profile = self.facebook.verify_token(token, &client.client_id, &client.client_secret).await?;
                let user = self.user_principal(IdentityProvider::Facebook, profile).await?;
                Ok(vec![Self::app_principal(&app), Principal::User(user)])
            },

            AuthScheme::Google => {
                let token = credentials.token.as_deref().ok_or(AppError::Unauthorized)?;
                // The implicit flow never uses the client credentials, but an
                // app that has not registered with the provider still cannot
                // authenticate callers through it.
                Self::provider_client(&app, IdentityProvider::Google)?;
                let profile = self.google.implicit_profile(token).await?.to_generic();
                let user = self.user_principal(IdentityProvider::Google, profile).await?;
                Ok(vec![Self::app_principal(&app), Principal::User(user)])
            },

            AuthScheme::Microsoft => {
                let token = credentials.token.as_deref().ok_or(AppError::Unauthorized)?;
                Self::provider_client(&app, IdentityProvider::Microsoft)?;
                let profile = self.microsoft.implicit_profile(token).await?.to_generic();
                let user = self.user_principal(IdentityProvider::Microsoft, profile).await?;
                Ok(vec![Self::app_principal(&app), Principal::User(user)])
            },

            AuthScheme::Twitter => {
                // TK carries the out-of-band verifier when a request token is
                // presented.
                let request_token = credentials.request_token.as_deref().ok_or(AppError::Unauthorized)?;
                let verifier = credentials.token.as_deref().ok_or(AppError::Unauthorized)?;
                let client = Self::provider_client(&app, IdentityProvider::Twitter)?;
                let profile = self
                    .twitter
                    .verify(&client.client_id, &client.client_secret, request_token, verifier)
                    .await?;
                let user = self.user_principal(IdentityProvider::Twitter, profile).await?;
                Ok(vec![Self::app_principal(&app), Principal::User(user)])
            },

            AuthScheme::Aads2s => {
                tracing::warn!(app_handle = %app.app_handle, "AADS2S scheme is not enabled in this deployment");
                Err(AppError::Unauthorized)
            },
        }
    }
}
