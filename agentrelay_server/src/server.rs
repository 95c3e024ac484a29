use std::net::SocketAddr;
use std::sync::Arc;

use agentrelay_core::{RelayError, TurnCoordinator};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{ApiError, Error, Result, handler};

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<TurnCoordinator>,
    pub expose_error_details: bool,
}

impl AppState {
    #[must_use]
    pub fn new(relay: TurnCoordinator, expose_error_details: bool) -> Self {
        Self {
            relay: Arc::new(relay),
            expose_error_details,
        }
    }

    /// Wrap a relay error for the response, honouring the details switch.
    #[must_use]
    pub const fn reject(&self, error: RelayError) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/api/session", post(handler::create_session))
        .route("/api/session/{session_id}", get(handler::get_session))
        .route("/api/chat", post(handler::chat))
        .route(
            "/api/conversation/{session_id}",
            get(handler::get_conversation).delete(handler::clear_conversation),
        )
        .route("/api/sessions", get(handler::list_sessions))
        .fallback(handler::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until SIGINT or SIGTERM.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;

    let local = listener.local_addr()?;
    let config = state.relay.config();
    info!("Server running on {local}");
    info!("Health check: http://{local}/health");
    info!("Agent ID: {}", config.agent_id);
    info!("Alias ID: {}", config.agent_alias_id);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        () = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
