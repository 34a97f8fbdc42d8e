//! Server module for Lumen Core.
//!
//! This module contains the HTTP router, its handlers and the request
//! logging middleware.

mod error;
mod handlers;
pub mod logging;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, QueryRequest};

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, get_service, post};
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Pipeline;
use lumen_models::GatewayFactory;
use logging::RequestLoggerLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }
}

/// Builds the application router.
///
/// `static_dir` must hold `index.html`, which is served at `/`. All of its
/// files are also served under `/static`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get_service(ServeFile::new(static_dir.join("index.html"))))
        .route("/userquery", post(handlers::user_query))
        .route("/health", get(handlers::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(RequestLoggerLayer)
}

/// Start the Lumen HTTP server and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the gateway cannot be built from the configuration or
/// the server fails to bind to the configured address.
pub async fn run(config: &Config) -> Result<()> {
    let gateway = GatewayFactory::create(&config.gateway)?;
    let state = AppState::new(Pipeline::new(gateway));
    let backend = state.pipeline.backend_id().to_string();

    if !config.server.static_dir.join("index.html").is_file() {
        warn!(static_dir = %config.server.static_dir.display(), "index.html not found, GET / will return 404");
    }

    let app = router(state, &config.server.static_dir);
    let listener = TcpListener::bind(config.server.address).await?;
    info!(address = %listener.local_addr()?, backend = %backend, "Lumen server started");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Lumen server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}

