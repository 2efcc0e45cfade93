//! Conversation command: an interactive session or a single turn.
//!
//! The buffer, history and theme are restored from the state directory on
//! start and written back after every change, so a session can be resumed
//! by simply running the command again.

use hellochat_config::Config;
use hellochat_conversation::ConversationManager;
use tracing::info;

use super::{build_provider, open_storage};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Keep all state in memory
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let provider = build_provider(&config)?;
        let storage = open_storage(&config, input.ephemeral)?;

        let mut params = config.agents.defaults.generation_params();
        if let Some(model) = input.model {
            params = params.with_model(model);
        }

        let mut manager = ConversationManager::new(provider, storage, params);

        if let Some(msg) = input.message {
            let outcome = manager.send_message(&msg).await?;
            println!("{}", outcome.reply.content);
            info!("Turn {} completed.", outcome.turn_number);
        } else {
            manager.run_interactive().await?;
            info!(
                "Conversation ended: {} messages in buffer",
                manager.messages().len()
            );
        }

        Ok(())
    }
}
