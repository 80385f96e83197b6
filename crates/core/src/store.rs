//! ChatStore trait — persistence of chat sessions, messages, and the
//! per-chat document registry.
//!
//! The store offers find/upsert semantics over single keys; no
//! transactions are required beyond what the backend provides natively.
//! Durable implementations live outside this workspace.

use crate::error::StoreError;
use crate::message::{ChatId, ChatMessage, ChatSession, DocumentSource};
use async_trait::async_trait;

/// The core ChatStore trait.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The backend name (e.g. "in_memory", "cosmos").
    fn name(&self) -> &str;

    /// Find a chat session by ID.
    async fn find_session(
        &self,
        chat_id: &ChatId,
    ) -> std::result::Result<Option<ChatSession>, StoreError>;

    /// Create or replace a chat session.
    async fn upsert_session(&self, session: ChatSession) -> std::result::Result<(), StoreError>;

    /// Fetch a window of a chat's messages, newest first.
    ///
    /// `offset` skips the newest `offset` messages; `limit` bounds the
    /// window size.
    async fn find_messages(
        &self,
        chat_id: &ChatId,
        offset: usize,
        limit: usize,
    ) -> std::result::Result<Vec<ChatMessage>, StoreError>;

    /// Persist a new message.
    async fn create_message(&self, message: ChatMessage) -> std::result::Result<(), StoreError>;

    /// Create or replace a message by ID (used to finalize a streamed
    /// bot response over its placeholder).
    async fn upsert_message(&self, message: ChatMessage) -> std::result::Result<(), StoreError>;

    /// List the documents registered to a chat, including pinned flags.
    async fn find_documents(
        &self,
        chat_id: &ChatId,
    ) -> std::result::Result<Vec<DocumentSource>, StoreError>;
}
