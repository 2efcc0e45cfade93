#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversation state for the chat client.
//!
//! The active buffer lives in a [`ConversationStore`], saved conversations in
//! a [`HistoryManager`], and [`ConversationManager`] ties both to a completion
//! provider, running one request per user turn.
//!
//! # Persistence
//! Every buffer mutation is written through to the key-value store before the
//! operation returns, and the history list is re-derived from the buffer after
//! each change.

mod error;
mod history;
mod manager;
mod session;
mod typewriter;

pub use error::ConversationError;
pub use history::{
    DEFAULT_TITLE, HISTORY_CAPACITY, HistoryEntry, HistoryManager, TITLE_ELLIPSIS,
    TITLE_PREFIX_CHARS, derive_title,
};
pub use manager::{ConversationManager, TurnOutcome, print_history};
pub use session::{ConversationStore, Theme};
pub use typewriter::{Frame, PlayOutcome, Timing, Typewriter};
