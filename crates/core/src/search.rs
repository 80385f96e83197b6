//! DocumentIndex trait — ranked passage search over indexed documents.
//!
//! The index returns scored text spans. Scopes in a query are OR'd
//! together, so one query can cover both chat-scoped and globally shared
//! documents without doubling embedding cost.

use crate::error::SearchError;
use crate::message::ChatId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A scope restricting which documents a search considers.
/// Multiple scopes in one query are OR'd together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SearchScope {
    /// Documents tagged with this chat's ID
    Chat { chat_id: ChatId },

    /// Documents tagged as globally shared
    Global,

    /// Any passage of this chat's documents, regardless of relevance
    /// ranking (used by the pinned-document pass)
    ChatDocuments { chat_id: ChatId },
}

/// A relevance search against the document index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search text
    pub text: String,

    /// OR'd document scopes
    pub scopes: Vec<SearchScope>,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_relevance: f64,

    /// Maximum number of hits
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// A single scored passage returned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The document this passage belongs to
    pub source_id: String,

    /// Human-readable source name
    pub source_name: String,

    /// Link to the source document
    pub link: String,

    /// The passage text
    pub text: String,

    /// Relevance score (0.0–1.0)
    pub relevance: f64,
}

/// The core DocumentIndex trait.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// The index name (e.g. "in_memory", "azure-ai-search").
    fn name(&self) -> &str;

    /// Run a relevance search, returning hits ranked by the backend.
    async fn search(&self, query: SearchQuery)
        -> std::result::Result<Vec<SearchHit>, SearchError>;
}
