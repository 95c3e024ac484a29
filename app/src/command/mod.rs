//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use std::sync::Arc;
use std::time::Duration;

use agentrelay_config::Config;
use agentrelay_core::{
    AgentGateway, InMemorySessionStore, SessionStore, TurnConfig, TurnCoordinator,
};
use agentrelay_gateway::{HttpAgentGateway, SigV4Signer};
use tracing::{info, warn};

mod ask;
mod info;
mod init;
mod serve;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use serve::{ServeInput, ServeStrategy};
pub use version::VersionStrategy;

/// Contract shared by all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Wire the HTTP gateway and an empty in-memory store into a coordinator.
fn build_coordinator(config: &Config) -> anyhow::Result<TurnCoordinator> {
    let agent = &config.agent;
    let endpoint = agent.resolved_endpoint();
    info!("Agent endpoint: {endpoint} (region {})", agent.region);

    let mut gateway = HttpAgentGateway::new(&endpoint)?
        .with_throttle_retry_delays(agent.throttle_retry_delays_secs.clone());
    if let Some(credentials) = &agent.credentials {
        info!("Signing agent requests with SigV4");
        gateway = gateway.with_signer(SigV4Signer::new(
            agent.region.as_str(),
            credentials.access_key_id.as_str(),
            credentials.secret_access_key.as_str(),
            credentials.session_token.clone(),
        ));
    } else if let Some(api_key) = &agent.api_key {
        gateway = gateway.with_api_key(api_key.clone());
    } else if agent.endpoint.is_none() {
        warn!("No AWS credentials configured; the agent runtime will reject unsigned requests");
    }

    let gateway: Arc<dyn AgentGateway> = Arc::new(gateway);
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    Ok(TurnCoordinator::new(
        gateway,
        store,
        TurnConfig {
            agent_id: agent.agent_id.clone(),
            agent_alias_id: agent.agent_alias_id.clone(),
            timeout: Duration::from_secs(agent.timeout_secs),
        },
    ))
}
