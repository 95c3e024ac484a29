use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// Include upstream error details in 500 responses. Development only.
    #[serde(default)]
    pub expose_error_details: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            expose_error_details: false,
        }
    }
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    const fn default_port() -> u16 {
        3000
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    pub agent_id: String,
    pub agent_alias_id: String,
    #[serde(default = "AgentConfig::default_region")]
    pub region: String,
    /// Overrides the regional runtime endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer key for relays that front the runtime. Unused when
    /// `credentials` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Signs requests with SigV4, as the regional runtime requires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<AwsCredentials>,
    #[serde(default = "AgentConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Waits before each retry of a throttled call. Empty disables retries.
    #[serde(default)]
    pub throttle_retry_delays_secs: Vec<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl AgentConfig {
    fn default_region() -> String {
        "us-east-1".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        120
    }

    /// The configured endpoint, or the regional runtime endpoint.
    #[must_use]
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.region)
        })
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "server": {
    "host": "0.0.0.0",
    "port": 3000,
    "expose_error_details": false
  },
  "agent": {
    "agent_id": "your-agent-id",
    "agent_alias_id": "your-agent-alias-id",
    "region": "us-east-1",
    "timeout_secs": 120,
    "throttle_retry_delays_secs": []
  }
}"#;

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'agentrelay init' to create config.",
                config_path.display()
            );
        }

        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Apply `PORT`, `AWS_REGION`, `AGENTRELAY_ENDPOINT`, `AGENTRELAY_API_KEY`,
    /// `AGENTRELAY_DEV` and the `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
    /// `AWS_SESSION_TOKEN` triple on top of the file values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(region) = lookup("AWS_REGION").filter(|r| !r.is_empty()) {
            self.agent.region = region;
        }
        if let Some(endpoint) = lookup("AGENTRELAY_ENDPOINT").filter(|e| !e.is_empty()) {
            self.agent.endpoint = Some(endpoint);
        }
        if let Some(api_key) = lookup("AGENTRELAY_API_KEY").filter(|k| !k.is_empty()) {
            self.agent.api_key = Some(api_key);
        }
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let (Some(access_key_id), Some(secret_access_key)) =
            (non_empty("AWS_ACCESS_KEY_ID"), non_empty("AWS_SECRET_ACCESS_KEY"))
        {
            self.agent.credentials = Some(AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: non_empty("AWS_SESSION_TOKEN"),
            });
        }
        if let Some(dev) = lookup("AGENTRELAY_DEV") {
            self.server.expose_error_details = matches!(
                dev.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "development"
            );
        }
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("agentrelay")
            .join("config.json"))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("agentrelay");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Set agent.agent_id and agent.agent_alias_id");
        println!("   2. Export AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY (or set agent.credentials)");
        println!("   3. Run 'agentrelay serve' to start the HTTP API");
        println!();
        println!("🔧 Environment overrides:");
        println!("   - PORT, AWS_REGION, AGENTRELAY_ENDPOINT, AGENTRELAY_API_KEY");
        println!("   - AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN");
        println!("   - AGENTRELAY_DEV=1 to include error details in responses");
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"{"agent": {"agent_id": "A", "agent_alias_id": "B"}}"#;

    #[test]
    fn template_parses() {
        let config = Config::from_json(CONFIG_TEMPLATE);
        assert!(config.is_ok());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn minimal_config_gets_defaults() {
        let config = Config::from_json(MINIMAL).expect("minimal config parses");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.server.expose_error_details);
        assert_eq!(config.agent.region, "us-east-1");
        assert_eq!(config.agent.timeout_secs, 120);
        assert!(config.agent.throttle_retry_delays_secs.is_empty());
        assert!(config.agent.credentials.is_none());
        assert_eq!(
            config.agent.resolved_endpoint(),
            "https://bedrock-agent-runtime.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn missing_agent_section_is_rejected() {
        assert!(Config::from_json(r#"{"server": {"port": 8080}}"#).is_err());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn environment_overrides_apply() {
        let mut config = Config::from_json(MINIMAL).expect("minimal config parses");
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "8081"),
            ("AWS_REGION", "eu-central-1"),
            ("AGENTRELAY_API_KEY", "secret"),
            ("AGENTRELAY_DEV", "true"),
        ]);

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.server.port, 8081);
        assert!(config.server.expose_error_details);
        assert_eq!(config.agent.api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.agent.resolved_endpoint(),
            "https://bedrock-agent-runtime.eu-central-1.amazonaws.com"
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn explicit_endpoint_wins_and_bad_port_is_ignored() {
        let mut config = Config::from_json(MINIMAL).expect("minimal config parses");
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "not-a-port"),
            ("AGENTRELAY_ENDPOINT", "http://localhost:9000"),
        ]);

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.agent.resolved_endpoint(), "http://localhost:9000");
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn aws_credentials_come_from_environment() {
        let mut config = Config::from_json(MINIMAL).expect("minimal config parses");
        let env: HashMap<&str, &str> = HashMap::from([
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", ""),
        ]);

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        let credentials = config.agent.credentials.expect("credentials set");
        assert_eq!(credentials.access_key_id, "AKIDEXAMPLE");
        assert_eq!(credentials.secret_access_key, "secret");
        assert_eq!(credentials.session_token, None);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn half_set_aws_credentials_are_ignored() {
        let mut config = Config::from_json(MINIMAL).expect("minimal config parses");
        let env: HashMap<&str, &str> = HashMap::from([("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")]);

        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert!(config.agent.credentials.is_none());
    }
}
