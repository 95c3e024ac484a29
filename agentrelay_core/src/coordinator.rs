//! One chat turn, from validation to the recorded agent reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    AgentGateway, AgentRequest, GatewayError, RelayError, Result, Role, SessionStore, aggregate,
};

/// Static settings for every turn a coordinator runs.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub agent_id: String,
    pub agent_alias_id: String,
    /// Upper bound on the agent call, fragment consumption included.
    pub timeout: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_alias_id: String::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// The finished reply handed back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

pub struct TurnCoordinator<G = Arc<dyn AgentGateway>, S = Arc<dyn SessionStore>>
where
    G: Send + Sync,
    S: Send + Sync,
{
    gateway: G,
    store: S,
    config: TurnConfig,
}

impl<G, S> TurnCoordinator<G, S>
where
    G: AgentGateway + Send + Sync,
    S: SessionStore + Send + Sync,
{
    pub const fn new(gateway: G, store: S, config: TurnConfig) -> Self {
        Self {
            gateway,
            store,
            config,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Run one request/response exchange for `session_id`.
    ///
    /// The user turn is recorded before the agent is called and stays in
    /// the log if the call fails. The agent turn is recorded only once the
    /// full reply has been aggregated.
    pub async fn handle_chat_turn(&self, session_id: &str, message: &str) -> Result<ChatReply> {
        if message.trim().is_empty() || session_id.trim().is_empty() {
            return Err(RelayError::InvalidInput);
        }

        let session = self.store.get_or_create_session(session_id).await;
        info!(
            "Processing turn for session {} ({} prior turns, message_len={})",
            session.id,
            session.message_count(),
            message.len()
        );

        self.store
            .append_turn(session_id, Role::User, message)
            .await?;

        let request = AgentRequest {
            agent_id: self.config.agent_id.clone(),
            agent_alias_id: self.config.agent_alias_id.clone(),
            session_id: session_id.to_string(),
            input_text: message.to_string(),
        };

        let response = match self.call_agent(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Agent call failed for session {session_id} [{}]: {}",
                    e.category(),
                    e.detail()
                );
                return Err(e.into());
            }
        };

        self.store
            .append_turn(session_id, Role::Agent, &response)
            .await?;

        info!(
            "Turn completed for session {session_id}: response_len={}",
            response.len()
        );

        Ok(ChatReply {
            response,
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Invoke the gateway and aggregate its reply under the configured timeout.
    async fn call_agent(&self, request: &AgentRequest) -> std::result::Result<String, GatewayError> {
        info!(
            "Invoking agent: agent_id={}, alias_id={}, session_id={}",
            request.agent_id, request.agent_alias_id, request.session_id
        );

        let exchange = async {
            let raw = self.gateway.invoke(request).await?;
            info!("Agent response received: kind={}", raw.kind());
            aggregate(raw).await
        };

        tokio::time::timeout(self.config.timeout, exchange)
            .await
            .unwrap_or_else(|_| {
                Err(GatewayError::Unclassified(format!(
                    "agent call timed out after {}s",
                    self.config.timeout.as_secs()
                )))
            })
    }
}
