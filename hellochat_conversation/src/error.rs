use hellochat_storage::StorageError;
use thiserror::Error;

/// Errors that can occur during conversation management.
///
/// Completion failures are not represented here: they are converted into
/// assistant messages and never interrupt the conversation.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Message input is empty")]
    EmptyInput,

    #[error("Cannot append a message with empty content")]
    EmptyMessage,

    #[error("A request is already in flight")]
    Busy,

    #[error("History entry not found: {0}")]
    HistoryNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
