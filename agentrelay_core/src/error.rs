use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors surfaced by the session store and the turn coordinator.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing message or session identifier. Raised before any mutation.
    #[error("Message and sessionId are required")]
    InvalidInput,

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Failure categories reported by an [`AgentGateway`](crate::AgentGateway).
///
/// Every variant carries the upstream detail text. Callers that face
/// untrusted users should show [`GatewayError::user_message`] instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("agent rejected the request: {0}")]
    Validation(String),

    #[error("agent or alias not found: {0}")]
    NotFound(String),

    #[error("access to the agent was denied: {0}")]
    AccessDenied(String),

    #[error("agent call was throttled: {0}")]
    Throttled(String),

    #[error("agent call failed: {0}")]
    Unclassified(String),
}

impl GatewayError {
    /// Stable, user-facing description of the failure category.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid request parameters. Please check your input.",
            Self::NotFound(_) => "Agent or alias not found. Please check the configuration.",
            Self::AccessDenied(_) => "Access denied. Please check your AWS permissions.",
            Self::Throttled(_) => "Request throttled. Please try again in a moment.",
            Self::Unclassified(_) => "An error occurred while processing your request.",
        }
    }

    /// Upstream detail, suitable for logs and development builds only.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(d)
            | Self::NotFound(d)
            | Self::AccessDenied(d)
            | Self::Throttled(d)
            | Self::Unclassified(d) => d,
        }
    }

    /// Short label used in log lines.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::Throttled(_) => "throttled",
            Self::Unclassified(_) => "unclassified",
        }
    }
}
