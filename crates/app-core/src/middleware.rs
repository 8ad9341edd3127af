//! The authentication gatekeeper and request logging middleware.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use super::error::AppError;
use super::principal::{AppPrincipal, Principal, UserPrincipal};

/// Scheme name that carries no user credential at all.
pub const ANONYMOUS_SCHEME: &str = "Anonymous";

/// Whether the route group the gatekeeper guards admits the anonymous scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousPolicy {
    Denied,
    Allowed,
}

/// API version parsed from the leading `v{major}.{minor}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl FromStr for ApiVersion {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AppError::BadApiVersion(s.to_string());

        let rest = s.strip_prefix('v').ok_or_else(malformed)?;
        let (major, minor) = rest.split_once('.').ok_or_else(malformed)?;

        Ok(Self {
            major: major.parse().map_err(|_| malformed())?,
            minor: minor.parse().map_err(|_| malformed())?,
        })
    }
}

/// Resolves a scheme name plus its credentials list into verified principals.
/// Implemented by the composite scheme dispatcher; mocked in tests.
#[async_trait::async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialAuthenticator: Send + Sync {
    async fn authenticate(&self, scheme: &str, credentials: &str) -> Result<Vec<Principal>, AppError>;
}

impl<S> FromRequestParts<S> for UserPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<UserPrincipal>().cloned().ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for AppPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AppPrincipal>().cloned().ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for ApiVersion
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<ApiVersion>().copied().ok_or(AppError::Internal)
    }
}

/// Gatekeeper for route groups that require a verified identity.
pub async fn require_identity(
    State(authenticator): State<Arc<dyn CredentialAuthenticator>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    gatekeeper(authenticator, AnonymousPolicy::Denied, req, next).await
}

/// Gatekeeper for route groups explicitly marked as open to the anonymous
/// scheme. Everything else behaves exactly like [`require_identity`].
pub async fn allow_anonymous(
    State(authenticator): State<Arc<dyn CredentialAuthenticator>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    gatekeeper(authenticator, AnonymousPolicy::Allowed, req, next).await
}

/// Runs the per-request authentication state machine: version parse, header
/// check, scheme eligibility, dispatch, then principal install. Any failure
/// raised by dispatch is logged with its cause and surfaced as the uniform
/// unauthorized error.
async fn gatekeeper(
    authenticator: Arc<dyn CredentialAuthenticator>,
    policy: AnonymousPolicy,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let version = parse_api_version(req.uri().path())?;

    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let (scheme, credentials) = split_authorization(authorization);

    if scheme.eq_ignore_ascii_case(ANONYMOUS_SCHEME) && policy == AnonymousPolicy::Denied {
        tracing::warn!(path = %req.uri().path(), "anonymous credentials on an authenticated endpoint");
        return Err(AppError::Unauthorized);
    }

    let principals = authenticator.authenticate(scheme, credentials).await.map_err(|err| {
        tracing::warn!(error = ?err, scheme, "credential verification failed");
        AppError::Unauthorized
    })?;

    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(version);
    for principal in principals {
        match principal {
            Principal::App(app) => {
                parts.extensions.insert(app);
            },
            Principal::User(user) => {
                parts.extensions.insert(user);
            },
        }
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn parse_api_version(path: &str) -> Result<ApiVersion, AppError> {
    path.trim_start_matches('/').split('/').next().unwrap_or_default().parse()
}

/// Splits `<Scheme> <CredentialsList>`. A header with no credentials list
/// yields an empty list and lets the dispatcher decide whether that is
/// acceptable for the scheme.
fn split_authorization(value: &str) -> (&str, &str) {
    match value.split_once(' ') {
        Some((scheme, credentials)) => (scheme, credentials.trim()),
        None => (value, ""),
    }
}

pub async fn request_logger(mut req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    let status = response.status();
    let duration_ms = started.elapsed().as_millis();

    response.headers_mut().insert(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_str(&request_id).unwrap_or_else(|_| HeaderValue::from_static("invalid-request-id")),
    );

    if status.is_server_error() {
        tracing::error!(request_id, method = %method, uri = %uri, status = %status, duration_ms, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(request_id, method = %method, uri = %uri, status = %status, duration_ms, "request rejected");
    } else {
        tracing::info!(request_id, method = %method, uri = %uri, status = %status, duration_ms, "request completed");
    }

    response
}
