use std::net::{IpAddr, SocketAddr};

use agentrelay_config::Config;
use agentrelay_server::AppState;
use tracing::info;

/// Input for the Serve command.
#[derive(Debug, Clone)]
pub struct ServeInput {
    /// Optional port (overrides config and `PORT`)
    pub port: Option<u16>,
}

/// Strategy for running the HTTP API.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let host: IpAddr = config.server.host.parse()?;
        let port = input.port.unwrap_or(config.server.port);
        let addr = SocketAddr::new(host, port);

        info!("AWS Region: {}", config.agent.region);
        if config.server.expose_error_details {
            info!("Error details will be included in API responses");
        }

        let relay = super::build_coordinator(&config)?;
        let state = AppState::new(relay, config.server.expose_error_details);

        agentrelay_server::serve(state, addr).await?;
        Ok(())
    }
}
