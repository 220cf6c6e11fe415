//! mcpchat HTTP server
//!
//! JSON endpoints over [`ChatService`]. The current conversation is carried
//! in the `mcpchat_conversation` cookie.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use mcpchat_core::{bootstrap, ChatService, ConfigFile};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub mod error;
pub mod handlers;
pub mod session;

pub use error::ApiError;
pub use session::SESSION_COOKIE;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

impl AppState {
    pub fn new(service: ChatService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/send/", post(handlers::send_message))
        .route("/new/", get(handlers::new_conversation))
        .route("/switch/:id/", get(handlers::switch_conversation))
        .route("/debug/tools/", get(handlers::debug_tools))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Build the service from `config` and serve until Ctrl-C
pub async fn run_server(config: ConfigFile) -> Result<()> {
    let service = bootstrap::build_service(&config).context("Failed to initialize chat service")?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "mcpchat listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await
        }
    }
}
