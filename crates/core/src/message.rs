//! Chat message and session domain types.
//!
//! These are the core value objects that flow through the entire system:
//! a user sends a message → the turn pipeline assembles a prompt → the
//! completion service streams a reply → the bot message is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    /// The end user
    User,
    /// The assistant
    Bot,
    /// Another human participant in a multi-user chat
    Participant,
}

/// What kind of content a message carries.
///
/// `Document` messages record an uploaded document; they never enter the
/// raw history — the memory retriever surfaces their content instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Message,
    Plan,
    Document,
}

/// A single message in a chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: String,

    /// The session this message belongs to
    pub chat_id: ChatId,

    /// Who authored this message
    pub author_role: AuthorRole,

    /// Platform user ID of the author
    pub user_id: String,

    /// Display name of the author
    pub user_name: String,

    /// The text content
    pub content: String,

    /// When the message was created
    pub timestamp: DateTime<Utc>,

    /// The kind of content this message carries
    pub message_type: MessageType,

    /// Token usage per consumer (e.g. "intent", "audience", "chat"),
    /// attached once a bot response completes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub token_usage: HashMap<String, u64>,

    /// Citations for memory sources surfaced in a bot response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<CitationSource>,

    /// Extracted reasoning ("thinking") content, if the model produced any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ChatMessage {
    /// Create a new user message.
    pub fn user(
        chat_id: ChatId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            author_role: AuthorRole::User,
            user_id: user_id.into(),
            user_name: user_name.into(),
            content: content.into(),
            timestamp: Utc::now(),
            message_type: MessageType::Message,
            token_usage: HashMap::new(),
            citations: Vec::new(),
            reasoning: None,
        }
    }

    /// Create a new bot message. Streaming responses start with empty
    /// content and are upserted again once the stream completes.
    pub fn bot(chat_id: ChatId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            author_role: AuthorRole::Bot,
            user_id: "bot".into(),
            user_name: "Mimir".into(),
            content: content.into(),
            timestamp: Utc::now(),
            message_type: MessageType::Message,
            token_usage: HashMap::new(),
            citations: Vec::new(),
            reasoning: None,
        }
    }

    /// Create a document record message (handled by the memory retriever,
    /// skipped by the history allotter).
    pub fn document(
        chat_id: ChatId,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_type: MessageType::Document,
            ..Self::user(chat_id, user_id, user_name, content)
        }
    }
}

/// A chat session. One per conversation; every message references it via
/// `chat_id`. Mutated rarely (model switch, description edit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session ID
    pub id: ChatId,

    /// The completion model serving this session
    pub model_id: String,

    /// Session-specific persona appended to the system instructions
    pub system_description: String,

    /// When this session was created
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(model_id: impl Into<String>, system_description: impl Into<String>) -> Self {
        Self {
            id: ChatId::new(),
            model_id: model_id.into(),
            system_description: system_description.into(),
            created_at: Utc::now(),
        }
    }
}

/// A registered document belonging to a chat, with its user-controlled
/// pinned flag. Pinned documents are always surfacing-eligible regardless
/// of computed relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Document ID (matches `SearchHit::source_id` for its passages)
    pub id: String,

    /// The chat this document was uploaded to
    pub chat_id: ChatId,

    /// Human-readable document name
    pub name: String,

    /// Link to the document (citation key)
    pub link: String,

    /// Whether the user flagged this document as always relevant
    pub pinned: bool,
}

/// A citation surfaced to the end user, derived from a retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    /// Human-readable source name
    pub source_name: String,

    /// Link to the source — the dedup key in a citation map
    pub link: String,

    /// The passage that matched
    pub snippet: String,

    /// Relevance score from the search backend (0.0–1.0)
    pub relevance_score: f64,
}

/// A link-keyed, insertion-ordered collection of citations.
/// First occurrence wins: adding a second citation for the same link is a
/// no-op, so multiple relevant passages from one source yield one citation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationMap {
    entries: Vec<CitationSource>,
}

impl CitationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a citation unless one with the same link already exists.
    /// Returns whether the citation was added.
    pub fn try_add(&mut self, citation: CitationSource) -> bool {
        if self.entries.iter().any(|c| c.link == citation.link) {
            return false;
        }
        self.entries.push(citation);
        true
    }

    pub fn get(&self, link: &str) -> Option<&CitationSource> {
        self.entries.iter().find(|c| c.link == link)
    }

    /// Citations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CitationSource> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<CitationSource> {
        self.entries
    }
}

/// Role of a structured prompt message handed to the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// A structured message in the final prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
        }
    }
}

/// The finished prompt for one chat turn. Transient: constructed once,
/// consumed by the completion call, then discarded — never persisted.
#[derive(Debug, Clone)]
pub struct PromptBundle {
    /// Static prefix + session persona
    pub system_instructions: String,

    /// Participant/audience summary ("" when extraction was skipped)
    pub audience: String,

    /// One-line intent summary of the new user message
    pub user_intent: String,

    /// Formatted memory section ("" when nothing qualified)
    pub memory_text: String,

    /// Formatted chat-history section
    pub history_text: String,

    /// Structured messages in chronological order, ready for the
    /// completion service
    pub messages: Vec<PromptMessage>,
}
