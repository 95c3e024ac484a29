//! Boundary to the remote agent service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::GatewayError;

/// Incremental reply fragments, in the order the agent emitted them.
pub type FragmentStream = BoxStream<'static, Result<Vec<u8>, GatewayError>>;

/// Everything the remote agent needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub agent_id: String,
    pub agent_alias_id: String,
    pub session_id: String,
    pub input_text: String,
}

/// The shapes an agent reply can arrive in.
pub enum GatewayResponse {
    /// Byte-bearing fragments that must be decoded and joined in order.
    FragmentSequence(FragmentStream),
    /// A single JSON document carrying the text under one of several fields.
    StructuredPayload(serde_json::Value),
    /// Nothing came back.
    Empty,
}

impl GatewayResponse {
    /// Label for log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FragmentSequence(_) => "fragments",
            Self::StructuredPayload(_) => "payload",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Debug for GatewayResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FragmentSequence(_) => f.write_str("FragmentSequence(..)"),
            Self::StructuredPayload(value) => {
                f.debug_tuple("StructuredPayload").field(value).finish()
            }
            Self::Empty => f.write_str("Empty"),
        }
    }
}

#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn invoke(&self, request: &AgentRequest) -> Result<GatewayResponse, GatewayError>;
}

#[async_trait]
impl<T: AgentGateway + ?Sized> AgentGateway for Arc<T> {
    async fn invoke(&self, request: &AgentRequest) -> Result<GatewayResponse, GatewayError> {
        (**self).invoke(request).await
    }
}
