//! In-memory chat store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use mimir_core::error::StoreError;
use mimir_core::message::{ChatId, ChatMessage, ChatSession, DocumentSource};
use mimir_core::store::ChatStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    sessions: HashMap<ChatId, ChatSession>,
    /// Messages per chat, insertion (chronological) order.
    messages: HashMap<ChatId, Vec<ChatMessage>>,
    documents: HashMap<ChatId, Vec<DocumentSource>>,
}

/// A chat store backed by in-process hash maps.
pub struct InMemoryChatStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Register a document for a chat (test/dev convenience).
    pub async fn add_document(&self, document: DocumentSource) {
        let mut inner = self.inner.write().await;
        inner
            .documents
            .entry(document.chat_id.clone())
            .or_default()
            .push(document);
    }

    /// Total message count across all chats.
    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.values().map(Vec::len).sum()
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn find_session(&self, chat_id: &ChatId) -> Result<Option<ChatSession>, StoreError> {
        Ok(self.inner.read().await.sessions.get(chat_id).cloned())
    }

    async fn upsert_session(&self, session: ChatSession) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_messages(
        &self,
        chat_id: &ChatId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        let Some(messages) = inner.messages.get(chat_id) else {
            return Ok(Vec::new());
        };

        // Stored chronologically; the contract is newest-first windows.
        Ok(messages
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .messages
            .entry(message.chat_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn upsert_message(&self, message: ChatMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let messages = inner.messages.entry(message.chat_id.clone()).or_default();
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => messages.push(message),
        }
        Ok(())
    }

    async fn find_documents(&self, chat_id: &ChatId) -> Result<Vec<DocumentSource>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .documents
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_session() -> (InMemoryChatStore, ChatId) {
        let store = InMemoryChatStore::new();
        let session = ChatSession::new("test-model", "You are a test assistant.");
        let chat_id = session.id.clone();
        store.upsert_session(session).await.unwrap();
        (store, chat_id)
    }

    #[tokio::test]
    async fn session_roundtrip() {
        let (store, chat_id) = store_with_session().await;
        let session = store.find_session(&chat_id).await.unwrap().unwrap();
        assert_eq!(session.model_id, "test-model");

        let missing = store.find_session(&ChatId::from("nope")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn upsert_session_replaces() {
        let (store, chat_id) = store_with_session().await;
        let mut session = store.find_session(&chat_id).await.unwrap().unwrap();
        session.model_id = "newer-model".into();
        store.upsert_session(session).await.unwrap();

        let reread = store.find_session(&chat_id).await.unwrap().unwrap();
        assert_eq!(reread.model_id, "newer-model");
    }

    #[tokio::test]
    async fn messages_window_is_newest_first() {
        let (store, chat_id) = store_with_session().await;
        for i in 0..5 {
            store
                .create_message(ChatMessage::user(
                    chat_id.clone(),
                    "u1",
                    "Alice",
                    format!("message {i}"),
                ))
                .await
                .unwrap();
        }

        let window = store.find_messages(&chat_id, 0, 3).await.unwrap();
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 4", "message 3", "message 2"]);

        let offset_window = store.find_messages(&chat_id, 2, 2).await.unwrap();
        let contents: Vec<&str> = offset_window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 2", "message 1"]);
    }

    #[tokio::test]
    async fn empty_chat_returns_empty_window() {
        let store = InMemoryChatStore::new();
        let window = store
            .find_messages(&ChatId::from("empty"), 0, 10)
            .await
            .unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn upsert_message_replaces_placeholder() {
        let (store, chat_id) = store_with_session().await;
        let placeholder = ChatMessage::bot(chat_id.clone(), "");
        let id = placeholder.id.clone();
        store.create_message(placeholder).await.unwrap();

        let mut finished = store.find_messages(&chat_id, 0, 1).await.unwrap().remove(0);
        finished.content = "final answer".into();
        store.upsert_message(finished).await.unwrap();

        assert_eq!(store.message_count().await, 1);
        let reread = store.find_messages(&chat_id, 0, 1).await.unwrap().remove(0);
        assert_eq!(reread.id, id);
        assert_eq!(reread.content, "final answer");
    }

    #[tokio::test]
    async fn documents_listed_per_chat() {
        let (store, chat_id) = store_with_session().await;
        store
            .add_document(DocumentSource {
                id: "doc-1".into(),
                chat_id: chat_id.clone(),
                name: "handbook.pdf".into(),
                link: "docs/handbook".into(),
                pinned: true,
            })
            .await;

        let docs = store.find_documents(&chat_id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].pinned);

        let other = store.find_documents(&ChatId::from("other")).await.unwrap();
        assert!(other.is_empty());
    }
}
