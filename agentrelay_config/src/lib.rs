//! Configuration loaded from `~/agentrelay/config.json`.

mod schema;

pub use schema::{AgentConfig, AwsCredentials, Config, ServerConfig};
