//! In-memory document index — keyword-scored passage search for tests and
//! ephemeral sessions. Real deployments point the retriever at a vector
//! search backend implementing the same trait.

use async_trait::async_trait;
use mimir_core::error::SearchError;
use mimir_core::message::ChatId;
use mimir_core::search::{DocumentIndex, SearchHit, SearchQuery, SearchScope};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A passage stored in the index, with its scoping tags.
#[derive(Debug, Clone)]
pub struct IndexedPassage {
    /// The document this passage belongs to
    pub source_id: String,

    /// Human-readable source name
    pub source_name: String,

    /// Link to the source document
    pub link: String,

    /// The passage text
    pub text: String,

    /// The chat this passage's document is scoped to, if any
    pub chat_id: Option<ChatId>,

    /// Whether the document is globally shared
    pub global: bool,
}

impl IndexedPassage {
    fn in_scope(&self, scopes: &[SearchScope]) -> bool {
        scopes.iter().any(|scope| match scope {
            SearchScope::Chat { chat_id } => self.chat_id.as_ref() == Some(chat_id),
            SearchScope::Global => self.global,
            SearchScope::ChatDocuments { chat_id } => self.chat_id.as_ref() == Some(chat_id),
        })
    }
}

/// A document index backed by an in-process passage list.
pub struct InMemoryDocumentIndex {
    passages: Arc<RwLock<Vec<IndexedPassage>>>,
}

impl InMemoryDocumentIndex {
    pub fn new() -> Self {
        Self {
            passages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a passage to the index.
    pub async fn add(&self, passage: IndexedPassage) {
        self.passages.write().await.push(passage);
    }

    pub async fn len(&self) -> usize {
        self.passages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.passages.read().await.is_empty()
    }
}

impl Default for InMemoryDocumentIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyword relevance: term occurrences normalized by passage length.
/// Clamped to 1.0 so scores stay comparable with vector backends.
fn keyword_relevance(text: &str, query: &str) -> f64 {
    let query = query.to_lowercase();
    if query.is_empty() {
        return 0.0;
    }

    let haystack = text.to_lowercase();
    let mut matched = 0usize;
    let mut terms = 0usize;
    for term in query.split_whitespace() {
        terms += 1;
        if haystack.contains(term) {
            matched += 1;
        }
    }
    if terms == 0 {
        return 0.0;
    }
    matched as f64 / terms as f64
}

#[async_trait]
impl DocumentIndex for InMemoryDocumentIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let passages = self.passages.read().await;

        let mut hits: Vec<SearchHit> = passages
            .iter()
            .filter(|p| p.in_scope(&query.scopes))
            .map(|p| SearchHit {
                source_id: p.source_id.clone(),
                source_name: p.source_name.clone(),
                link: p.link.clone(),
                text: p.text.clone(),
                relevance: keyword_relevance(&p.text, &query.text),
            })
            .filter(|h| h.relevance >= query.min_relevance)
            .collect();

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(query.limit);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, chat: Option<&ChatId>, global: bool) -> IndexedPassage {
        IndexedPassage {
            source_id: "doc-1".into(),
            source_name: "doc.pdf".into(),
            link: "docs/doc".into(),
            text: text.into(),
            chat_id: chat.cloned(),
            global,
        }
    }

    fn query(text: &str, scopes: Vec<SearchScope>, min_relevance: f64) -> SearchQuery {
        SearchQuery {
            text: text.into(),
            scopes,
            min_relevance,
            limit: 100,
        }
    }

    #[tokio::test]
    async fn scopes_are_ored() {
        let chat = ChatId::new();
        let other = ChatId::new();
        let index = InMemoryDocumentIndex::new();
        index.add(passage("vacation policy details", Some(&chat), false)).await;
        index.add(passage("vacation policy summary", None, true)).await;
        index.add(passage("vacation policy draft", Some(&other), false)).await;

        let hits = index
            .search(query(
                "vacation policy",
                vec![
                    SearchScope::Chat {
                        chat_id: chat.clone(),
                    },
                    SearchScope::Global,
                ],
                0.0,
            ))
            .await
            .unwrap();

        // Chat-scoped + global match; the other chat's passage does not.
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| !h.text.contains("draft")));
    }

    #[tokio::test]
    async fn min_relevance_filters() {
        let index = InMemoryDocumentIndex::new();
        index.add(passage("completely unrelated content", None, true)).await;
        index.add(passage("the vacation policy allows ten days", None, true)).await;

        let hits = index
            .search(query("vacation policy", vec![SearchScope::Global], 0.7))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("ten days"));
    }

    #[tokio::test]
    async fn chat_documents_scope_ignores_topic_match() {
        let chat = ChatId::new();
        let index = InMemoryDocumentIndex::new();
        index.add(passage("quarterly budget numbers", Some(&chat), false)).await;

        // Relevance 0 against this query, but min 0.0 still surfaces it.
        let hits = index
            .search(query(
                "vacation",
                vec![SearchScope::ChatDocuments {
                    chat_id: chat.clone(),
                }],
                0.0,
            ))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn results_sorted_by_relevance_and_limited() {
        let index = InMemoryDocumentIndex::new();
        index.add(passage("alpha", None, true)).await;
        index.add(passage("alpha beta", None, true)).await;
        index.add(passage("gamma", None, true)).await;

        let mut q = query("alpha beta", vec![SearchScope::Global], 0.0);
        q.limit = 2;
        let hits = index.search(q).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits[0].relevance >= hits[1].relevance);
        assert_eq!(hits[0].text, "alpha beta");
    }

    #[tokio::test]
    async fn empty_index_returns_no_hits() {
        let index = InMemoryDocumentIndex::new();
        let hits = index
            .search(query("anything", vec![SearchScope::Global], 0.0))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
