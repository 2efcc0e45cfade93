use hellochat_config::Config;
use hellochat_conversation::{HistoryManager, print_history};
use hellochat_core::Role;

use super::open_storage;

#[derive(Debug, Clone)]
pub struct HistoryInput {
    /// 1-based position of a saved chat to print in full
    pub show: Option<usize>,
}

/// Strategy for listing saved conversations.
///
/// Reads the persisted history only; no credential is needed.
#[derive(Debug, Clone, Copy)]
pub struct HistoryStrategy;

impl super::CommandStrategy for HistoryStrategy {
    type Input = HistoryInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let history = HistoryManager::restore(open_storage(&config, false)?);

        let Some(n) = input.show else {
            print_history(history.list_all());
            return Ok(());
        };

        let entry = n
            .checked_sub(1)
            .and_then(|i| history.list_all().get(i))
            .ok_or_else(|| anyhow::anyhow!("No saved chat #{n}"))?;

        println!("=== {} ===\n", entry.title);
        for message in &entry.messages {
            let label = match message.role {
                Role::User => "you",
                Role::Assistant | Role::System => "assistant",
            };
            println!("{label}: {}\n", message.content);
        }
        Ok(())
    }
}
