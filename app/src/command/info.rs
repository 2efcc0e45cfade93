use hellochat_config::{API_KEY_ENV, Config};
use hellochat_providers::DEFAULT_BASE_URL;

/// Strategy for displaying configuration information.
///
/// This strategy outputs:
/// - API key (masked) and endpoint
/// - Generation defaults (model, tokens, temperature)
/// - State directory
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== hellochat Configuration ===\n");

        println!("Config file: {}", Config::config_path()?.display());
        println!();

        println!("Provider:");
        println!("  Groq API key: {}", config.providers.groq.masked_api_key());
        if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
            println!("  (from {API_KEY_ENV})");
        }
        println!(
            "  Endpoint: {}",
            config
                .providers
                .groq
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
        );
        println!();

        println!("Generation Defaults:");
        println!("  Model: {}", config.agents.defaults.model);
        println!("  Max Tokens: {}", config.agents.defaults.max_tokens);
        println!("  Temperature: {}", config.agents.defaults.temperature);
        println!();

        println!("Storage:");
        println!("  State directory: {}", config.state_dir()?.display());

        Ok(())
    }
}
