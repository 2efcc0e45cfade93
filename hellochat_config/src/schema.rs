use hellochat_core::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GenerationParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Value written by `hellochat init`; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "your-groq-api-key-here";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    #[serde(default = "AgentDefaults::default_model")]
    pub model: String,
    #[serde(default = "AgentDefaults::default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "AgentDefaults::default_temperature")]
    pub temperature: f64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            max_tokens: Self::default_max_tokens(),
            temperature: Self::default_temperature(),
        }
    }
}

impl AgentDefaults {
    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    const fn default_max_tokens() -> usize {
        DEFAULT_MAX_TOKENS
    }

    const fn default_temperature() -> f64 {
        DEFAULT_TEMPERATURE
    }

    #[must_use]
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub groq: ProviderConfig,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ProviderConfig {
    /// The API key with the first and last four characters visible.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        let count = key.chars().count();
        if count > 8 {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().skip(count - 4).collect();
            format!("{head}...{tail}")
        } else if key.is_empty() {
            "(not set)".to_string()
        } else {
            "***".to_string()
        }
    }

    fn has_usable_key(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    /// Directory for persisted conversation state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load `~/hellochat/config.json` and apply the `GROQ_API_KEY` override.
    ///
    /// The credential is not checked here; commands that talk to the remote
    /// call [`Config::require_api_key`].
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::load_from(&Self::config_path()?)?
            .with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {}: {e}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace the file's API key with `key` when it is set and non-empty.
    #[must_use]
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            debug!("Using API key from {API_KEY_ENV}");
            self.providers.groq.api_key = key;
        }
        self
    }

    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        if self.providers.groq.has_usable_key() {
            Ok(&self.providers.groq.api_key)
        } else {
            anyhow::bail!(
                "No Groq API key configured. Set {API_KEY_ENV} or run 'hellochat init' and edit {}.",
                Self::config_path()
                    .map_or_else(|_| "the config file".to_string(), |p| p.display().to_string())
            )
        }
    }

    /// Directory holding persisted conversation state.
    pub fn state_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.storage.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("state")),
        }
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("hellochat"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_path = Self::create_config_in(&Self::config_dir()?)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your Groq API key");
        println!("      (or export {API_KEY_ENV} instead)");
        println!("   2. Run 'hellochat chat' to start a conversation");
        println!();
        Ok(())
    }

    /// Write the config template into `dir`, refusing to overwrite.
    pub fn create_config_in(dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let template = Self {
            providers: ProvidersConfig {
                groq: ProviderConfig {
                    api_key: PLACEHOLDER_API_KEY.to_string(),
                    base_url: None,
                },
            },
            ..Self::default()
        };
        std::fs::write(&config_path, serde_json::to_string_pretty(&template)?)?;
        Ok(config_path)
    }
}
