//! Conversation manager for the chat client.
//!
//! `ConversationManager` is the application state: it owns the buffer, the
//! saved-conversation list, the theme flag and the busy flag, and it is the
//! only place that mutates them. Every buffer change goes through
//! [`ConversationManager::after_buffer_change`], which re-derives the history
//! entry for the active conversation.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use hellochat_core::{
    ChatMessage, CompletionError, CompletionErrorKind, GenerationParams, LLMProvider, Role,
};
use hellochat_storage::KeyValueStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ConversationError;
use crate::history::{HistoryEntry, HistoryManager};
use crate::session::{ConversationStore, Theme};
use crate::typewriter::Typewriter;

const LOADING_TICK: Duration = Duration::from_millis(400);

/// Result of one user turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant message appended to the buffer: either the model's
    /// reply or the synthesized error text.
    pub reply: ChatMessage,
    /// Set when the completion failed.
    pub error: Option<CompletionErrorKind>,
    /// 1-based count of user messages in the buffer.
    pub turn_number: usize,
}

/// Clears the busy flag when the turn ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, ConversationError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ConversationError::Busy)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ConversationManager<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    provider: P,
    params: GenerationParams,
    conversation: ConversationStore,
    history: HistoryManager,
    busy: Arc<AtomicBool>,
}

impl<P> ConversationManager<P>
where
    P: LLMProvider + Send + Sync,
{
    /// Create a manager, restoring buffer, theme and history from `storage`.
    pub fn new(provider: P, storage: Arc<dyn KeyValueStore>, params: GenerationParams) -> Self {
        info!("Creating conversation manager: model={}", params.model);
        let conversation = ConversationStore::restore(storage.clone());
        let history = HistoryManager::restore(storage);

        Self {
            provider,
            params,
            conversation,
            history,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process one user turn.
    ///
    /// Appends the user message, requests a completion for the whole buffer
    /// and appends the reply. A failed completion appends an assistant
    /// message describing the failure instead; it is reported through
    /// [`TurnOutcome::error`], never as `Err`.
    pub async fn send_message(&mut self, input: &str) -> Result<TurnOutcome, ConversationError> {
        if input.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        let _busy = BusyGuard::acquire(&self.busy)?;

        self.append(ChatMessage::user(input));
        let turn_number = self
            .conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();
        info!("Processing turn {turn_number}");

        let result = self
            .provider
            .complete(self.conversation.messages(), &self.params)
            .await
            .and_then(|reply| {
                if reply.content.trim().is_empty() {
                    Err(CompletionError::UnknownError("Empty response from LLM".into()))
                } else {
                    Ok(reply)
                }
            });

        let (reply, error) = match result {
            Ok(reply) => (reply, None),
            Err(e) => {
                warn!("Completion failed: {e}");
                (ChatMessage::assistant(e.user_message()), Some(e.kind()))
            }
        };

        self.append(reply.clone());
        debug!("Turn {turn_number} completed");

        Ok(TurnOutcome {
            reply,
            error,
            turn_number,
        })
    }

    /// Start a new conversation. The previous one stays in history.
    pub fn new_chat(&mut self) {
        if let Err(e) = self.conversation.reset() {
            warn!("Failed to persist cleared conversation: {e}");
        }
        info!("Started new conversation");
    }

    /// Replace the buffer with a saved conversation.
    pub fn load_from_history(&mut self, id: i64) -> Result<(), ConversationError> {
        let entry = self.history.load(id)?;
        if let Err(e) = self.conversation.load(entry) {
            warn!("Failed to persist loaded conversation: {e}");
        }
        self.after_buffer_change();
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Theme {
        match self.conversation.toggle_theme() {
            Ok(theme) => theme,
            Err(e) => {
                warn!("Failed to persist theme: {e}");
                self.conversation.theme()
            }
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        self.history.list_all()
    }

    #[must_use]
    pub const fn theme(&self) -> Theme {
        self.conversation.theme()
    }

    #[must_use]
    pub const fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Whether a completion request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn append(&mut self, message: ChatMessage) {
        if let Err(e) = self.conversation.append(message) {
            warn!("Failed to append message: {e}");
        }
        self.after_buffer_change();
    }

    /// On-change hook: keep the history entry for the active buffer current.
    fn after_buffer_change(&mut self) {
        if self.conversation.is_empty() {
            return;
        }
        if let Err(e) = self.history.derive_and_save(self.conversation.messages()) {
            warn!("Failed to save history: {e}");
        }
    }

    /// Run an interactive conversation loop on stdin/stdout.
    pub async fn run_interactive(&mut self) -> Result<(), ConversationError> {
        println!("=== hellochat ({}) ===", self.params.model);
        println!("Type /help for commands, 'exit' to quit.\n");

        if self.conversation.is_empty() {
            play_greeting().await;
        } else {
            for message in self.conversation.messages() {
                println!("{}\n", render_message(message, self.theme()));
            }
        }

        loop {
            print!("> ");
            flush_stdout();

            let mut input = String::new();
            let read = std::io::stdin().read_line(&mut input)?;
            let input = input.trim();

            if read == 0 || matches!(input, "exit" | "quit" | "q") {
                println!("\nBye.");
                break;
            }

            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                self.handle_command(input);
                continue;
            }

            print!("  ");
            flush_stdout();
            let indicator = tokio::spawn(loading_indicator(
                self.busy.clone(),
                LOADING_TICK,
                || {
                    print!(".");
                    flush_stdout();
                },
            ));
            let result = self.send_message(input).await;
            indicator.abort();
            println!();

            match result {
                Ok(outcome) => {
                    println!("\n{}\n", render_message(&outcome.reply, self.theme()));
                }
                Err(e) => eprintln!("Error: {e}"),
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, input: &str) {
        let mut parts = input.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("/new"), _) => {
                self.new_chat();
                println!("Started a new chat.\n");
            }
            (Some("/history"), _) => print_history(self.history()),
            (Some("/load"), Some(n)) => {
                let id = n
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| self.history().get(i))
                    .map(|entry| entry.id);
                match id.map(|id| self.load_from_history(id)) {
                    Some(Ok(())) => {
                        for message in self.conversation.messages() {
                            println!("{}\n", render_message(message, self.theme()));
                        }
                    }
                    Some(Err(e)) => eprintln!("Error: {e}"),
                    None => eprintln!("No saved chat #{n}. See /history."),
                }
            }
            (Some("/theme"), _) => {
                let theme = self.toggle_theme();
                println!("Theme: {}\n", if theme.is_dark() { "dark" } else { "light" });
            }
            _ => print_help(),
        }
    }
}

/// Calls `on_tick` once per `period` while a completion is in flight. Runs
/// until aborted.
async fn loading_indicator<F>(busy: Arc<AtomicBool>, period: Duration, mut on_tick: F)
where
    F: FnMut(),
{
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if busy.load(Ordering::Acquire) {
            on_tick();
        }
    }
}

fn flush_stdout() {
    if let Err(e) = std::io::stdout().flush() {
        debug!("stdout flush failed: {e}");
    }
}

async fn play_greeting() {
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let mut typewriter = Typewriter::new("hello");
    typewriter
        .play(
            1,
            |text| {
                print!("\r\x1b[2K{text}|");
                flush_stdout();
            },
            cancel_rx,
        )
        .await;
    println!("\rHow can I help you today?\n");
}

fn print_help() {
    println!("Commands:");
    println!("  /new         start a new chat");
    println!("  /history     list saved chats");
    println!("  /load <n>    open saved chat number n");
    println!("  /theme       toggle dark mode");
    println!("  exit         quit\n");
}

/// Print saved chats as a numbered list with their local save date.
pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No chat history yet\n");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>2}. {}  ({})",
            i + 1,
            entry.title,
            entry.timestamp.with_timezone(&Local).format("%Y-%m-%d")
        );
    }
    println!();
}

fn render_message(message: &ChatMessage, theme: Theme) -> String {
    let (label, color) = match (message.role, theme) {
        (Role::User, Theme::Light) => ("you", "\x1b[1m"),
        (Role::User, Theme::Dark) => ("you", "\x1b[1;94m"),
        (_, Theme::Light) => ("assistant", "\x1b[2m"),
        (_, Theme::Dark) => ("assistant", "\x1b[97m"),
    };
    format!("{color}{label}\x1b[0m: {}", message.content)
}
