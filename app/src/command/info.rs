use agentrelay_config::Config;

/// Strategy for displaying the effective configuration.
///
/// Environment overrides are already applied; secrets are masked.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== agentrelay Configuration ===\n");

        println!("Server:");
        println!("  Listen: {}:{}", config.server.host, config.server.port);
        println!(
            "  Error details: {}",
            if config.server.expose_error_details {
                "exposed"
            } else {
                "hidden"
            }
        );
        println!();

        println!("Agent:");
        println!("  Agent ID: {}", config.agent.agent_id);
        println!("  Alias ID: {}", config.agent.agent_alias_id);
        println!("  Region: {}", config.agent.region);
        println!("  Endpoint: {}", config.agent.resolved_endpoint());
        println!(
            "  API key: {}",
            config.agent.api_key.as_deref().map_or("(none)".to_string(), mask_secret)
        );
        println!(
            "  AWS credentials: {}",
            config
                .agent
                .credentials
                .as_ref()
                .map_or("(none)".to_string(), |c| mask_secret(&c.access_key_id))
        );
        println!("  Timeout: {}s", config.agent.timeout_secs);
        if config.agent.throttle_retry_delays_secs.is_empty() {
            println!("  Throttle retries: disabled");
        } else {
            println!(
                "  Throttle retries: {:?}s",
                config.agent.throttle_retry_delays_secs
            );
        }

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_secret_keeps_edges() {
        assert_eq!(mask_secret("abcd1234567890wxyz"), "abcd...wxyz");
    }

    #[test]
    fn short_secret_is_fully_hidden() {
        assert_eq!(mask_secret("short"), "***");
    }
}
