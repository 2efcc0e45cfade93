//! The active conversation buffer.
//!
//! The buffer is append-only between resets: messages are never reordered or
//! removed individually. It is replaced wholesale when a saved conversation is
//! loaded.

use std::sync::Arc;

use hellochat_core::ChatMessage;
use hellochat_storage::{KeyValueStore, MESSAGES_KEY, THEME_KEY, read_json, write_json};
use tracing::{debug, info};

use crate::error::ConversationError;
use crate::history::HistoryEntry;

/// UI colour preference. Persisted as the boolean `isDarkMode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn from_dark(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }

    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Owner of the active message buffer and the theme flag.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    messages: Vec<ChatMessage>,
    theme: Theme,
}

impl ConversationStore {
    /// Create an empty store without reading persisted state.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            messages: Vec::new(),
            theme: Theme::default(),
        }
    }

    /// Read the last persisted buffer and theme.
    ///
    /// Missing or corrupt values fall back to an empty buffer and the default
    /// theme.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let messages: Vec<ChatMessage> =
            read_json(storage.as_ref(), MESSAGES_KEY).unwrap_or_default();
        let theme = read_json::<bool>(storage.as_ref(), THEME_KEY)
            .map(Theme::from_dark)
            .unwrap_or_default();

        info!(
            "Restored conversation: {} messages, theme={theme:?}",
            messages.len()
        );

        Self {
            storage,
            messages,
            theme,
        }
    }

    /// Add a message to the end of the buffer.
    pub fn append(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        if message.content.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        self.messages.push(message);
        self.persist()
    }

    /// Clear the buffer for a new conversation. Saved history is untouched.
    pub fn reset(&mut self) -> Result<(), ConversationError> {
        self.messages.clear();
        self.persist()
    }

    /// Replace the buffer with a copy of a saved conversation.
    pub fn load(&mut self, entry: &HistoryEntry) -> Result<(), ConversationError> {
        self.messages.clone_from(&entry.messages);
        debug!("Loaded history entry {} into buffer", entry.id);
        self.persist()
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), ConversationError> {
        self.theme = theme;
        self.persist()
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, ConversationError> {
        self.set_theme(self.theme.toggled())?;
        Ok(self.theme)
    }

    fn persist(&self) -> Result<(), ConversationError> {
        write_json(self.storage.as_ref(), MESSAGES_KEY, &self.messages)?;
        write_json(self.storage.as_ref(), THEME_KEY, &self.theme.is_dark())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellochat_storage::MemoryStore;

    fn storage() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn append_persists_full_buffer() {
        let storage = storage();
        let mut store = ConversationStore::new(storage.clone());

        store.append(ChatMessage::user("Hi")).unwrap();
        store.append(ChatMessage::assistant("Hello")).unwrap();

        let persisted: Vec<ChatMessage> = read_json(storage.as_ref(), MESSAGES_KEY).unwrap();
        assert_eq!(
            persisted,
            vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello")]
        );
    }

    #[test]
    fn append_rejects_empty_content() {
        let mut store = ConversationStore::new(storage());
        assert!(matches!(
            store.append(ChatMessage::user("")),
            Err(ConversationError::EmptyMessage)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn reset_clears_buffer_and_storage() {
        let storage = storage();
        let mut store = ConversationStore::new(storage.clone());
        store.append(ChatMessage::user("Hi")).unwrap();

        store.reset().unwrap();

        assert!(store.is_empty());
        let persisted: Vec<ChatMessage> = read_json(storage.as_ref(), MESSAGES_KEY).unwrap();
        assert!(persisted.is_empty());
    }

    #[test]
    fn restore_reproduces_buffer_and_theme() {
        let storage = storage();
        let mut store = ConversationStore::new(storage.clone());
        store.append(ChatMessage::user("one")).unwrap();
        store.append(ChatMessage::assistant("two")).unwrap();
        store.append(ChatMessage::user("three")).unwrap();
        store.set_theme(Theme::Dark).unwrap();
        let expected = store.messages().to_vec();
        drop(store);

        let restored = ConversationStore::restore(storage);
        assert_eq!(restored.messages(), expected.as_slice());
        assert_eq!(restored.theme(), Theme::Dark);
    }

    #[test]
    fn restore_falls_back_on_missing_or_corrupt_state() {
        let storage = storage();
        storage.set(MESSAGES_KEY, "{{{").unwrap();
        storage.set(THEME_KEY, "\"maybe\"").unwrap();

        let store = ConversationStore::restore(storage);
        assert!(store.is_empty());
        assert_eq!(store.theme(), Theme::Light);
    }

    #[test]
    fn toggle_theme_flips_and_persists() {
        let storage = storage();
        let mut store = ConversationStore::new(storage.clone());

        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(read_json::<bool>(storage.as_ref(), THEME_KEY), Some(true));
        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(read_json::<bool>(storage.as_ref(), THEME_KEY), Some(false));
    }
}
