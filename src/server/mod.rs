pub mod handlers;
mod types;
mod upload;

pub use handlers::AppState;
pub use types::*;
pub use upload::IMAGE_FIELD;

use crate::{Result, config::Config, removal::{ModelSession, create_session_loader}};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Room for multipart boundaries and headers around the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    // The upload reader enforces the real limit; this only stops runaway bodies
    let body_limit = state
        .config
        .limits
        .max_upload_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/api/remove-background",
            post(handlers::remove_background).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let session = Arc::new(ModelSession::new(create_session_loader(&config.model)));

    if config.model.eager_load {
        info!("Eagerly loading model '{}'", config.model.name);
        session.get().await?;
    }

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let app_state = AppState {
        session,
        config: Arc::new(config),
    };
    let app = router(app_state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
