//! Memory retrieval — token-budgeted, citation-aware document snippets.
//!
//! One combined relevance search covers both chat-scoped and globally
//! shared documents (two OR'd scopes, one query — no doubled embedding
//! cost). Pinned documents are fetched in a separate unconditional pass
//! that bypasses the relevance threshold; they still consume token budget
//! like everything else.

use crate::token;
use mimir_config::PromptOptions;
use mimir_core::error::{Error, StoreError};
use mimir_core::message::{ChatId, CitationMap, CitationSource};
use mimir_core::sanitize::Sanitizer;
use mimir_core::search::{DocumentIndex, SearchHit, SearchQuery, SearchScope};
use mimir_core::store::ChatStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Renders accepted passages under the memory header, grouped by source.
pub fn format_snippets(accepted: &[(String, String)]) -> String {
    if accepted.is_empty() {
        return String::new();
    }

    let mut text = String::from("Memory snippets:");
    let mut last_source: Option<&str> = None;
    for (source_name, passage) in accepted {
        if last_source != Some(source_name.as_str()) {
            text.push_str(&format!("\n[{source_name}]:"));
            last_source = Some(source_name);
        }
        text.push_str(&format!("\n{passage}"));
    }
    text
}

/// Queries the document index and fits the results into a token budget.
pub struct MemoryRetriever {
    store: Arc<dyn ChatStore>,
    index: Arc<dyn DocumentIndex>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    options: PromptOptions,
}

impl MemoryRetriever {
    pub fn new(
        store: Arc<dyn ChatStore>,
        index: Arc<dyn DocumentIndex>,
        options: PromptOptions,
    ) -> Self {
        Self {
            store,
            index,
            sanitizer: None,
            options,
        }
    }

    /// Attach an optional PII sanitizer applied to the prompt copy of each
    /// passage.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Retrieve memory for a topic within `token_budget` tokens.
    ///
    /// Returns the formatted memory section (empty string when nothing
    /// qualifies) and the citation map for the surfaced sources.
    pub async fn query(
        &self,
        topic: &str,
        chat_id: &ChatId,
        token_budget: usize,
    ) -> Result<(String, CitationMap), Error> {
        self.store
            .find_session(chat_id)
            .await?
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;

        // One query, two OR'd scopes: this chat's documents + global ones.
        let mut hits = self
            .index
            .search(SearchQuery {
                text: topic.to_string(),
                scopes: vec![
                    SearchScope::Chat {
                        chat_id: chat_id.clone(),
                    },
                    SearchScope::Global,
                ],
                min_relevance: self.options.relevance_threshold,
                limit: self.options.document_search_limit,
            })
            .await?;

        // Pinned pass: always-relevant documents bypass the threshold.
        // Failures here degrade gracefully — the query continues unpinned.
        match self.pinned_hits(topic, chat_id).await {
            Ok(pinned) => {
                for hit in pinned {
                    if !hits.iter().any(|h| h.text == hit.text) {
                        hits.push(hit);
                    }
                }
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Pinned document retrieval failed, skipping");
            }
        }

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (accepted, citations) = self.fit_to_budget(hits, token_budget);

        debug!(
            chat_id = %chat_id,
            snippets = accepted.len(),
            citations = citations.len(),
            "Memory retrieval complete"
        );

        Ok((format_snippets(&accepted), citations))
    }

    /// Fetch passages belonging to this chat's pinned documents.
    async fn pinned_hits(&self, topic: &str, chat_id: &ChatId) -> Result<Vec<SearchHit>, Error> {
        let documents = self.store.find_documents(chat_id).await?;
        let pinned_ids: HashSet<&str> = documents
            .iter()
            .filter(|d| d.pinned)
            .map(|d| d.id.as_str())
            .collect();
        if pinned_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Search any passage of this chat's documents, then keep only the
        // pinned ones client-side.
        let hits = self
            .index
            .search(SearchQuery {
                text: topic.to_string(),
                scopes: vec![SearchScope::ChatDocuments {
                    chat_id: chat_id.clone(),
                }],
                min_relevance: 0.0,
                limit: self.options.document_search_limit,
            })
            .await?;

        Ok(hits
            .into_iter()
            .filter(|h| pinned_ids.contains(h.source_id.as_str()))
            .collect())
    }

    /// Walk relevance-sorted hits, sanitizing and accepting passages while
    /// the budget holds out. Acceptance requires a strictly positive
    /// remainder; the first over-budget passage halts the walk.
    fn fit_to_budget(
        &self,
        hits: Vec<SearchHit>,
        token_budget: usize,
    ) -> (Vec<(String, String)>, CitationMap) {
        let mut remaining = token_budget;
        let mut accepted: Vec<(String, String)> = Vec::new();
        let mut citations = CitationMap::new();
        let mut seen_texts: HashSet<String> = HashSet::new();

        for hit in hits {
            // Identical passages from different sources: first-seen wins.
            if !seen_texts.insert(hit.text.clone()) {
                continue;
            }

            let passage = match &self.sanitizer {
                Some(sanitizer) => {
                    let result = sanitizer.sanitize(&hit.text);
                    if !result.is_clean() {
                        warn!(
                            source = %hit.source_name,
                            categories = ?result.categories,
                            "Redacted PII from memory passage"
                        );
                    }
                    result.text
                }
                None => hit.text.clone(),
            };

            let cost = token::count(&passage);
            if remaining <= cost {
                break;
            }
            remaining -= cost;

            citations.try_add(CitationSource {
                source_name: hit.source_name.clone(),
                link: hit.link.clone(),
                snippet: passage.clone(),
                relevance_score: hit.relevance,
            });
            accepted.push((hit.source_name, passage));
        }

        (accepted, citations)
    }
}
