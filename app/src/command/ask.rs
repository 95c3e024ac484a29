use agentrelay_config::Config;
use agentrelay_core::RelayError;
use tracing::info;
use uuid::Uuid;

/// Input parameters for the Ask command strategy.
#[derive(Debug, Clone)]
pub struct AskInput {
    /// Message to send to the agent
    pub message: String,
    /// Session to use (a fresh one when omitted)
    pub session_id: Option<String>,
}

/// Strategy for a single round-trip to the agent.
///
/// Runs the same turn path as the HTTP API, which makes it the quickest way
/// to check agent ids, region and credentials from a shell.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let relay = super::build_coordinator(&config)?;

        let session_id = input
            .session_id
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        info!("Using session: {session_id}");

        match relay.handle_chat_turn(&session_id, &input.message).await {
            Ok(reply) => {
                println!("{}", reply.response);
                Ok(())
            }
            Err(RelayError::Gateway(e)) => {
                anyhow::bail!("{} ({})", e.user_message(), e.detail())
            }
            Err(e) => Err(e.into()),
        }
    }
}
