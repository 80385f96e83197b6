//! History allotment — fitting recent chat history into a token budget.
//!
//! The allotter walks a chat's messages newest-first so that messages
//! closest to "now" win when budget is scarce, but the assembled output is
//! chronological: display lines are prepended, and structured entries are
//! reversed before being handed back.

use crate::token;
use mimir_config::PromptOptions;
use mimir_core::error::StoreError;
use mimir_core::message::{AuthorRole, ChatId, ChatMessage, MessageType, PromptMessage};
use mimir_core::store::ChatStore;
use std::sync::Arc;
use tracing::debug;

/// Formats one message for the history display block.
pub fn format_line(message: &ChatMessage) -> String {
    format!(
        "[{}] {}: {}",
        message.timestamp.format("%d %b %Y %H:%M"),
        message.user_name,
        message.content.trim()
    )
}

/// Builds the structured prompt entry for one accepted message.
///
/// Bot messages become assistant entries with trimmed raw content — no
/// author or timestamp preamble, preserving natural-language fidelity for
/// the model. User and participant messages become user entries with a
/// timestamp preamble; the author name is omitted for the anonymous
/// default identity (auth disabled).
pub fn structured_entry(message: &ChatMessage, anonymous_user_id: &str) -> PromptMessage {
    match message.author_role {
        AuthorRole::Bot => PromptMessage::assistant(message.content.trim()),
        AuthorRole::User | AuthorRole::Participant => {
            if message.user_id == anonymous_user_id {
                PromptMessage::user(format!(
                    "[{}] {}",
                    message.timestamp.format("%d %b %Y %H:%M"),
                    message.content.trim()
                ))
            } else {
                PromptMessage::user(format_line(message))
            }
        }
    }
}

/// Walks a chat's history newest-first under a token budget.
pub struct HistoryAllotter {
    store: Arc<dyn ChatStore>,
    options: PromptOptions,
}

impl HistoryAllotter {
    pub fn new(store: Arc<dyn ChatStore>, options: PromptOptions) -> Self {
        Self { store, options }
    }

    /// Allot history for a chat within `token_limit` tokens.
    ///
    /// Returns the display block (`"Chat history:\n..."`). When `sink` is
    /// provided, accepted messages are also appended to it as structured
    /// entries in chronological order, and per-message costs include the
    /// role framing overhead.
    pub async fn allot(
        &self,
        chat_id: &ChatId,
        token_limit: usize,
        sink: Option<&mut Vec<PromptMessage>>,
    ) -> Result<String, StoreError> {
        let messages = self
            .store
            .find_messages(chat_id, 0, self.options.history_window)
            .await?;

        let mut remaining = token_limit;
        let mut display = String::new();
        // Built newest-first (oldest at the end) because of the walk order;
        // reversed before merging into the caller's sink.
        let mut structured: Vec<PromptMessage> = Vec::new();
        let mut included = 0usize;

        for message in &messages {
            // Documents are surfaced by the memory retriever, not raw history.
            if message.message_type == MessageType::Document {
                continue;
            }

            let formatted = format_line(message);
            let entry = sink
                .as_ref()
                .map(|_| structured_entry(message, &self.options.anonymous_user_id));

            let cost = match &entry {
                Some(e) => token::context_count(e.role, &formatted),
                None => token::count(&formatted),
            };

            // Budget exhaustion halts the walk; older messages are not
            // considered once one fails to fit.
            if cost > remaining {
                break;
            }
            remaining -= cost;
            included += 1;

            if display.is_empty() {
                display = formatted;
            } else {
                display = format!("{formatted}\n{display}");
            }
            if let Some(e) = entry {
                structured.push(e);
            }
        }

        if let Some(sink) = sink {
            structured.reverse();
            sink.extend(structured);
        }

        debug!(
            chat_id = %chat_id,
            included,
            available = messages.len(),
            remaining_tokens = remaining,
            "Allotted chat history"
        );

        Ok(format!("Chat history:\n{}", display.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_core::message::{ChatSession, PromptRole};
    use mimir_store::InMemoryChatStore;

    async fn seeded_store(messages: &[(&str, &str, &str)]) -> (Arc<InMemoryChatStore>, ChatId) {
        let store = Arc::new(InMemoryChatStore::new());
        let session = ChatSession::new("test-model", "persona");
        let chat_id = session.id.clone();
        store.upsert_session(session).await.unwrap();
        for (user_id, name, content) in messages {
            let msg = if *user_id == "bot" {
                ChatMessage::bot(chat_id.clone(), *content)
            } else {
                ChatMessage::user(chat_id.clone(), *user_id, *name, *content)
            };
            store.create_message(msg).await.unwrap();
        }
        (store, chat_id)
    }

    fn allotter(store: Arc<InMemoryChatStore>) -> HistoryAllotter {
        HistoryAllotter::new(store, PromptOptions::default())
    }

    #[tokio::test]
    async fn empty_chat_yields_empty_body() {
        let (store, chat_id) = seeded_store(&[]).await;
        let text = allotter(store).allot(&chat_id, 500, None).await.unwrap();
        assert_eq!(text, "Chat history:\n");
    }

    #[tokio::test]
    async fn display_is_chronological() {
        let (store, chat_id) = seeded_store(&[
            ("u1", "Alice", "first question"),
            ("bot", "Mimir", "first answer"),
            ("u1", "Alice", "second question"),
        ])
        .await;

        let text = allotter(store).allot(&chat_id, 10_000, None).await.unwrap();
        let first = text.find("first question").unwrap();
        let answer = text.find("first answer").unwrap();
        let second = text.find("second question").unwrap();
        assert!(first < answer && answer < second);
    }

    #[tokio::test]
    async fn newest_messages_win_when_budget_is_scarce() {
        let (store, chat_id) = seeded_store(&[
            ("u1", "Alice", "oldest message that should be dropped first"),
            ("u1", "Alice", "middle message"),
            ("u1", "Alice", "newest message"),
        ])
        .await;

        // Enough for roughly one formatted line.
        let text = allotter(store).allot(&chat_id, 14, None).await.unwrap();
        assert!(text.contains("newest message"));
        assert!(!text.contains("oldest message"));
    }

    #[tokio::test]
    async fn budget_exhaustion_halts_not_skips() {
        let (store, chat_id) = seeded_store(&[
            ("u1", "Alice", "tiny"),
            (
                "u1",
                "Alice",
                "a very long middle message that will not fit the remaining budget at all",
            ),
            ("u1", "Alice", "newest"),
        ])
        .await;

        // Fits "newest" but not the long middle message; the walk must stop
        // there instead of skipping ahead to "tiny".
        let text = allotter(store).allot(&chat_id, 15, None).await.unwrap();
        assert!(text.contains("newest"));
        assert!(!text.contains("middle"));
        assert!(!text.contains("tiny"));
    }

    #[tokio::test]
    async fn document_messages_are_skipped() {
        let (store, chat_id) = seeded_store(&[("u1", "Alice", "a question")]).await;
        store
            .create_message(ChatMessage::document(
                chat_id.clone(),
                "u1",
                "Alice",
                "uploaded-report.pdf",
            ))
            .await
            .unwrap();

        let text = allotter(store).allot(&chat_id, 10_000, None).await.unwrap();
        assert!(text.contains("a question"));
        assert!(!text.contains("uploaded-report.pdf"));
    }

    #[tokio::test]
    async fn structured_sink_is_chronological() {
        let (store, chat_id) = seeded_store(&[
            ("u1", "Alice", "question one"),
            ("bot", "Mimir", "answer one"),
            ("u1", "Alice", "question two"),
        ])
        .await;

        let mut sink = Vec::new();
        allotter(store)
            .allot(&chat_id, 10_000, Some(&mut sink))
            .await
            .unwrap();

        assert_eq!(sink.len(), 3);
        assert!(sink[0].content.contains("question one"));
        assert_eq!(sink[1].role, PromptRole::Assistant);
        assert_eq!(sink[1].content, "answer one");
        assert!(sink[2].content.contains("question two"));
    }

    #[tokio::test]
    async fn bot_entries_have_no_preamble() {
        let (store, chat_id) = seeded_store(&[("bot", "Mimir", "  the answer  ")]).await;

        let mut sink = Vec::new();
        allotter(store)
            .allot(&chat_id, 10_000, Some(&mut sink))
            .await
            .unwrap();

        assert_eq!(sink[0].role, PromptRole::Assistant);
        assert_eq!(sink[0].content, "the answer");
    }

    #[tokio::test]
    async fn anonymous_user_keeps_timestamp_but_drops_name() {
        let (store, chat_id) =
            seeded_store(&[("default-user", "Anonymous", "hello there")]).await;

        let mut sink = Vec::new();
        allotter(store)
            .allot(&chat_id, 10_000, Some(&mut sink))
            .await
            .unwrap();

        assert_eq!(sink[0].role, PromptRole::User);
        assert!(sink[0].content.starts_with('['));
        assert!(sink[0].content.ends_with("hello there"));
        assert!(!sink[0].content.contains("Anonymous"));
    }

    #[tokio::test]
    async fn allot_is_idempotent() {
        let (store, chat_id) = seeded_store(&[
            ("u1", "Alice", "one"),
            ("bot", "Mimir", "two"),
            ("u1", "Alice", "three"),
        ])
        .await;

        let allotter = allotter(store);
        let first = allotter.allot(&chat_id, 100, None).await.unwrap();
        let second = allotter.allot(&chat_id, 100, None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn zero_budget_includes_nothing() {
        let (store, chat_id) = seeded_store(&[("u1", "Alice", "something")]).await;
        let text = allotter(store).allot(&chat_id, 0, None).await.unwrap();
        assert_eq!(text, "Chat history:\n");
    }
}
