//! Saved-conversation list.
//!
//! The list is ordered most-recent-first and never holds more than
//! [`HISTORY_CAPACITY`] entries. After every change to the active buffer a
//! fresh snapshot is derived and either replaces the entry for the same
//! conversation or is pushed to the front, evicting from the tail.
//!
//! "Same conversation" is a heuristic: equal first-message content and a
//! message count that is either equal to the buffer's or one less (the
//! snapshot the latest append extended). Two distinct conversations that open
//! with the same text and have the same length are merged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use hellochat_core::ChatMessage;
use hellochat_storage::{HISTORY_KEY, KeyValueStore, read_json, write_json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConversationError;

/// Maximum number of saved conversations.
pub const HISTORY_CAPACITY: usize = 10;

/// Number of leading characters of the first message used as the title.
pub const TITLE_PREFIX_CHARS: usize = 30;

pub const TITLE_ELLIPSIS: &str = "...";

/// Title used for a snapshot of an empty buffer.
pub const DEFAULT_TITLE: &str = "New Chat";

/// A snapshot of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation time in epoch milliseconds, unique within the list.
    pub id: i64,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn first_content(&self) -> Option<&str> {
        self.messages.first().map(|m| m.content.as_str())
    }
}

/// Title for a buffer: the first 30 characters of its first message followed
/// by an ellipsis, or [`DEFAULT_TITLE`] for an empty buffer.
#[must_use]
pub fn derive_title(messages: &[ChatMessage]) -> String {
    messages.first().map_or_else(
        || DEFAULT_TITLE.to_string(),
        |first| {
            let prefix: String = first.content.chars().take(TITLE_PREFIX_CHARS).collect();
            format!("{prefix}{TITLE_ELLIPSIS}")
        },
    )
}

pub struct HistoryManager {
    storage: Arc<dyn KeyValueStore>,
    entries: Vec<HistoryEntry>,
}

impl HistoryManager {
    /// Create an empty list without reading persisted state.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            entries: Vec::new(),
        }
    }

    /// Read the persisted list. Missing or corrupt data yields an empty list.
    pub fn restore(storage: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<HistoryEntry> =
            read_json(storage.as_ref(), HISTORY_KEY).unwrap_or_default();
        entries.truncate(HISTORY_CAPACITY);
        info!("Restored {} history entries", entries.len());
        Self { storage, entries }
    }

    /// Snapshot `buffer` into the list and persist the list.
    ///
    /// Empty buffers are ignored.
    pub fn derive_and_save(&mut self, buffer: &[ChatMessage]) -> Result<(), ConversationError> {
        self.derive_and_save_at(buffer, Utc::now())
    }

    fn derive_and_save_at(
        &mut self,
        buffer: &[ChatMessage],
        now: DateTime<Utc>,
    ) -> Result<(), ConversationError> {
        let Some(first) = buffer.first() else {
            debug!("Skipping history update for empty buffer");
            return Ok(());
        };

        let candidate = HistoryEntry {
            id: self.next_id(now),
            title: derive_title(buffer),
            messages: buffer.to_vec(),
            timestamp: now,
        };

        if let Some(index) = self.find_same_conversation(&first.content, buffer.len()) {
            debug!(
                "Replacing history entry {} at position {index}",
                self.entries[index].id
            );
            self.entries[index] = candidate;
        } else {
            debug!("Adding history entry {}", candidate.id);
            self.entries.insert(0, candidate);
            self.entries.truncate(HISTORY_CAPACITY);
        }

        self.persist()
    }

    /// Look up a saved conversation by id.
    pub fn load(&self, id: i64) -> Result<&HistoryEntry, ConversationError> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(ConversationError::HistoryNotFound(id))
    }

    /// All entries, most recent first.
    #[must_use]
    pub fn list_all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Epoch millis of `now`, bumped past the newest id already in the list.
    ///
    /// A restored list may hold an id of `i64::MAX`; nothing can follow it, so
    /// the first free id from `now` onwards is taken instead.
    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let now_ms = now.timestamp_millis();
        let Some(newest) = self.entries.iter().map(|entry| entry.id).max() else {
            return now_ms;
        };
        match newest.checked_add(1) {
            Some(next) => now_ms.max(next),
            None => (now_ms..=i64::MAX)
                .find(|id| !self.entries.iter().any(|entry| entry.id == *id))
                .unwrap_or(now_ms),
        }
    }

    fn find_same_conversation(&self, first_content: &str, len: usize) -> Option<usize> {
        let opens_with = |entry: &HistoryEntry| entry.first_content() == Some(first_content);

        self.entries
            .iter()
            .position(|entry| opens_with(entry) && entry.messages.len() == len)
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|entry| opens_with(entry) && entry.messages.len() + 1 == len)
            })
    }

    fn persist(&self) -> Result<(), ConversationError> {
        write_json(self.storage.as_ref(), HISTORY_KEY, &self.entries)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellochat_storage::MemoryStore;

    fn manager() -> (Arc<dyn KeyValueStore>, HistoryManager) {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        (storage.clone(), HistoryManager::new(storage))
    }

    #[test]
    fn title_is_thirty_char_prefix_with_ellipsis() {
        let content = "The quick brown fox jumps over the lazy dog";
        let title = derive_title(&[ChatMessage::user(content)]);
        assert_eq!(title, "The quick brown fox jumps over...");
        assert_eq!(title, format!("{}...", &content[..30]));
    }

    #[test]
    fn short_first_message_still_gets_ellipsis() {
        assert_eq!(derive_title(&[ChatMessage::user("Hi")]), "Hi...");
    }

    #[test]
    fn title_counts_characters_not_bytes() {
        let content = "日本語".repeat(20);
        let title = derive_title(&[ChatMessage::user(content)]);
        assert_eq!(title.chars().count(), TITLE_PREFIX_CHARS + TITLE_ELLIPSIS.len());
    }

    #[test]
    fn empty_buffer_title_is_default() {
        assert_eq!(derive_title(&[]), DEFAULT_TITLE);
    }

    #[test]
    fn empty_buffer_is_not_saved() {
        let (_, mut history) = manager();
        history.derive_and_save(&[]).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn same_length_same_opening_replaces_in_place() {
        let (_, mut history) = manager();
        history.derive_and_save(&[ChatMessage::user("A")]).unwrap();
        history.derive_and_save(&[ChatMessage::user("B")]).unwrap();
        let old_id = history.list_all()[1].id;

        history.derive_and_save(&[ChatMessage::user("A")]).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.list_all()[1].messages[0].content, "A");
        assert_ne!(history.list_all()[1].id, old_id);
    }

    #[test]
    fn different_length_beyond_one_is_a_new_entry() {
        let (_, mut history) = manager();
        history.derive_and_save(&[ChatMessage::user("Hi")]).unwrap();
        history
            .derive_and_save(&[
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello"),
                ChatMessage::user("How are you?"),
            ])
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let (_, mut history) = manager();
        for i in 0..25 {
            history
                .derive_and_save(&[ChatMessage::user(format!("conversation {i}"))])
                .unwrap();
            assert!(history.len() <= HISTORY_CAPACITY);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.list_all()[0].messages[0].content, "conversation 24");
    }

    #[test]
    fn ids_are_unique_within_the_same_millisecond() {
        let (_, mut history) = manager();
        let now = Utc::now();
        history
            .derive_and_save_at(&[ChatMessage::user("a")], now)
            .unwrap();
        history
            .derive_and_save_at(&[ChatMessage::user("b")], now)
            .unwrap();

        let ids: Vec<i64> = history.list_all().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![now.timestamp_millis() + 1, now.timestamp_millis()]);
    }

    #[test]
    fn maximal_restored_id_does_not_overflow() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let old = HistoryEntry {
            id: i64::MAX,
            title: "Old...".to_string(),
            messages: vec![ChatMessage::user("Old")],
            timestamp: Utc::now(),
        };
        write_json(storage.as_ref(), HISTORY_KEY, &[old]).unwrap();
        let mut history = HistoryManager::restore(storage);

        let now = Utc::now();
        history
            .derive_and_save_at(&[ChatMessage::user("a")], now)
            .unwrap();
        history
            .derive_and_save_at(&[ChatMessage::user("b")], now)
            .unwrap();

        let mut ids: Vec<i64> = history.list_all().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 3);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        for entry in history.list_all() {
            assert_eq!(history.load(entry.id).unwrap(), entry);
        }
        assert_eq!(history.list_all()[0].messages[0].content, "b");
    }

    #[test]
    fn load_finds_by_id_or_reports_missing() {
        let (_, mut history) = manager();
        history.derive_and_save(&[ChatMessage::user("Hi")]).unwrap();
        let id = history.list_all()[0].id;

        assert_eq!(history.load(id).unwrap().title, "Hi...");
        assert!(matches!(
            history.load(id + 1000),
            Err(ConversationError::HistoryNotFound(_))
        ));
    }

    #[test]
    fn list_is_persisted_and_restored() {
        let (storage, mut history) = manager();
        history.derive_and_save(&[ChatMessage::user("first")]).unwrap();
        history.derive_and_save(&[ChatMessage::user("second")]).unwrap();
        let expected = history.list_all().to_vec();

        let restored = HistoryManager::restore(storage);
        assert_eq!(restored.list_all(), expected.as_slice());
    }

    #[test]
    fn persisted_entries_use_documented_field_names() {
        let (storage, mut history) = manager();
        history.derive_and_save(&[ChatMessage::user("Hi")]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&storage.get(HISTORY_KEY).unwrap().unwrap()).unwrap();
        let entry = &raw[0];
        assert!(entry["id"].is_i64());
        assert_eq!(entry["title"], "Hi...");
        assert_eq!(entry["messages"][0]["role"], "user");
        assert!(entry["timestamp"].is_string());
    }

    #[test]
    fn corrupt_history_restores_empty() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(HISTORY_KEY, "not json").unwrap();
        assert!(HistoryManager::restore(storage).is_empty());
    }
}
