//! The binary entry point for the application.

use std::sync::Arc;
use std::time::Duration;

use app_core::config::Settings;
use app_core::middleware::{allow_anonymous, request_logger, require_identity};
use app_core::principal::{AppPrincipal, UserPrincipal};
use app_core::session::{JwtSessionService, SessionConfig, SessionTokenService};
use auth::{InMemoryAppRegistry, InMemoryUserDirectory};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, middleware, routing};
use tokio::signal;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_target(true).with_file(true).with_line_number(true))
        .init();

    if let Err(err) = run().await {
        panic!("application failed to start: {err}");
    }
}

/// Initializes all dependencies and starts the web server.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Arc::new(Settings::load("config/config.yaml")?);

    // Outbound provider calls share the request deadline.
    let timeout = Duration::from_secs(settings.server.timeout_secs);
    let http = reqwest::Client::builder().timeout(timeout).build()?;

    let session: Arc<dyn SessionTokenService> = Arc::new(JwtSessionService::new(SessionConfig {
        secret: settings.session.secret.clone(),
        issuer: settings.session.issuer.clone(),
        expiration_secs: settings.session.expiration_secs,
    }));

    let registry = Arc::new(InMemoryAppRegistry::from_settings(&settings.apps));
    let directory = Arc::new(InMemoryUserDirectory::new());

    let authenticator = auth::new(auth::Dependency {
        settings: settings.clone(),
        http,
        session,
        registry,
        directory,
    });

    // Versioned API surface. Only routes in the `open` group admit the
    // anonymous scheme.
    let protected = Router::new()
        .route("/{version}/me", routing::get(whoami))
        .route_layer(middleware::from_fn_with_state(authenticator.clone(), require_identity));
    let open = Router::new()
        .route("/{version}/ping", routing::get(ping))
        .route_layer(middleware::from_fn_with_state(authenticator, allow_anonymous));

    let app = Router::new()
        .merge(protected)
        .merge(open)
        .route("/health", routing::get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"message": "Endpoint not found"})),
            )
        })
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_logger))
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(timeout)),
        );

    let listener = tokio::net::TcpListener::bind(&settings.server.address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_shutdown_listener(shutdown_tx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_tx.subscribe().recv().await.ok();
            tracing::info!("server is shutting down gracefully");
        })
        .await?;

    Ok(())
}

async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({"message": "pong"}))
}

async fn whoami(app: AppPrincipal, user: UserPrincipal) -> impl IntoResponse {
    Json(serde_json::json!({
        "app_handle": app.app_handle,
        "user_handle": user.user_handle,
        "identity_provider": user.identity_provider.to_string(),
    }))
}

/// Spawns a background task to listen for system shutdown signals.
fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT (Ctrl+C)") },
            _ = terminate => { tracing::info!("received SIGTERM") },
        }

        if shutdown_tx.send(()).is_err() {
            tracing::error!("failed to send shutdown signal");
        }
    });
}
