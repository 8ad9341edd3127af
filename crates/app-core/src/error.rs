//! Centralized error handling with a single external face for auth failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use super::config::ConfigError;
use super::oauth::OAuthError;
use super::principal::PrincipalError;
use super::session::SessionError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid API version: {0}")]
    BadApiVersion(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("OAuth verification failed")]
    OAuth(#[from] OAuthError),

    #[error("Session token rejected")]
    Session(#[from] SessionError),

    #[error("Malformed principal")]
    Principal(#[from] PrincipalError),

    #[error("Config operation failed")]
    Config(#[from] ConfigError),

    #[error("An internal server error occurred")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    /// Every authentication failure maps to the same opaque unauthorized
    /// response. The internal cause is logged here and never echoed to the
    /// client, so callers cannot probe which check or provider rejected them.
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadApiVersion(version) => {
                (StatusCode::BAD_REQUEST, format!("Invalid API version: {version}"))
            },
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::OAuth(err) => {
                tracing::warn!(error = ?err, "credential rejected during verification");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            },
            AppError::Session(err) => {
                tracing::warn!(error = ?err, "session token rejected");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            },
            AppError::Principal(err) => {
                tracing::warn!(error = ?err, "malformed principal");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            },
            AppError::Config(err) => {
                tracing::error!(error = ?err, "configuration failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            },
            AppError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal server error occurred".to_string())
            },
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
