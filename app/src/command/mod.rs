//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::sync::Arc;

use hellochat_config::Config;
use hellochat_providers::GroqProvider;
use hellochat_storage::{FileStore, KeyValueStore, MemoryStore};
use tracing::info;

mod chat;
mod history;
mod info;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use history::{HistoryInput, HistoryStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Open the durable state store, or an in-memory one for ephemeral runs.
fn open_storage(config: &Config, ephemeral: bool) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if ephemeral {
        info!("Ephemeral session: state will not be persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(FileStore::new(config.state_dir()?)?))
}

/// Build the completion client from config. Fails without a usable API key.
fn build_provider(config: &Config) -> anyhow::Result<GroqProvider> {
    let api_key = config.require_api_key()?.to_string();
    let provider = GroqProvider::new(api_key);
    Ok(match &config.providers.groq.base_url {
        Some(base_url) => provider.with_base_url(base_url.clone()),
        None => provider,
    })
}

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type via the associated type, so
/// adding a command only requires implementing this trait.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
