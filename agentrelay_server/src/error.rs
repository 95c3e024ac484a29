use std::net::SocketAddr;

use agentrelay_core::RelayError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures starting or running the HTTP listener.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A request failure rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    error: RelayError,
    expose_details: bool,
}

impl ApiError {
    #[must_use]
    pub const fn new(error: RelayError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.error {
            RelayError::InvalidInput => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.error {
            RelayError::InvalidInput => json!({ "error": "Message and sessionId are required" }),
            RelayError::NotFound(_) => json!({ "error": "Session not found" }),
            RelayError::Gateway(e) => {
                error!("Error invoking agent [{}]: {}", e.category(), e.detail());
                if self.expose_details {
                    json!({ "error": e.user_message(), "details": e.detail() })
                } else {
                    json!({ "error": e.user_message() })
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
