//! Prompt assembly — the per-turn orchestrator.
//!
//! Stages run in a fixed order, each depleting the same turn budget before
//! the next computes its share: render system instructions → extract
//! intent (and audience) → retrieve memory → allot history → finalize.
//! Assembly is stateless across turns; every invocation is independent and
//! works from an immutable options value.

use crate::budget::TurnBudget;
use crate::extract::{Extraction, IntentExtractor};
use crate::history::{self, HistoryAllotter};
use crate::retriever::MemoryRetriever;
use crate::token;
use mimir_config::PromptOptions;
use mimir_core::completion::{CompletionService, ReasoningEffort};
use mimir_core::error::Error;
use mimir_core::message::{
    ChatMessage, ChatSession, CitationMap, PromptBundle, PromptMessage, PromptRole,
};
use mimir_core::sanitize::Sanitizer;
use mimir_core::search::DocumentIndex;
use mimir_core::store::ChatStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Renders the system instruction block.
///
/// The static prefix is byte-identical across all requests and rendered
/// first so any downstream prompt caching can reuse it; the
/// session-specific persona follows, optionally prefixed with a
/// reasoning-effort instruction when the model supports native reasoning.
pub fn render_system_instructions(
    options: &PromptOptions,
    session: &ChatSession,
    effort: Option<ReasoningEffort>,
) -> String {
    let persona = match effort {
        Some(effort) => format!("{}\n{}", effort.instruction(), session.system_description),
        None => session.system_description.clone(),
    };
    format!("{}\n\n{}", options.static_instructions, persona)
}

/// Everything a turn needs from assembly: the prompt bundle plus the
/// citation map and extraction token usage to attach to the bot message.
#[derive(Debug)]
pub struct Assembly {
    pub bundle: PromptBundle,
    pub citations: CitationMap,
    pub token_usage: HashMap<String, u64>,
}

/// Assembles a token-bounded prompt for one chat turn.
pub struct PromptAssembler {
    history: Arc<HistoryAllotter>,
    retriever: MemoryRetriever,
    extractor: IntentExtractor,
    options: PromptOptions,
}

impl PromptAssembler {
    pub fn new(
        store: Arc<dyn ChatStore>,
        index: Arc<dyn DocumentIndex>,
        completion: Arc<dyn CompletionService>,
        options: PromptOptions,
    ) -> Self {
        let history = Arc::new(HistoryAllotter::new(store.clone(), options.clone()));
        let retriever = MemoryRetriever::new(store, index, options.clone());
        let extractor = IntentExtractor::new(completion, history.clone(), options.clone());
        Self {
            history,
            retriever,
            extractor,
            options,
        }
    }

    /// Attach an optional PII sanitizer for retrieved passages.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.retriever = self.retriever.with_sanitizer(sanitizer);
        self
    }

    /// Assemble the prompt for a new user message.
    pub async fn assemble(
        &self,
        session: &ChatSession,
        user_message: &ChatMessage,
        effort: Option<ReasoningEffort>,
    ) -> Result<Assembly, Error> {
        let chat_id = &session.id;

        // ── RenderSystem ───────────────────────────────────────────────
        let system_instructions = render_system_instructions(&self.options, session, effort);
        let mut budget = TurnBudget::new(self.options.prompt_ceiling());
        budget.charge(token::count(&system_instructions));

        // ── ExtractIntent(+Audience) ───────────────────────────────────
        let anonymous = user_message.user_id == self.options.anonymous_user_id;
        let extraction = match self
            .extractor
            .extract(&session.model_id, chat_id, &user_message.content, anonymous)
            .await
        {
            Ok(extraction) => extraction,
            Err(e) => {
                // Degraded: retrieval falls back to the raw message text.
                warn!(chat_id = %chat_id, error = %e, "Extraction failed, using raw message");
                Extraction::default()
            }
        };

        let audience_text = if extraction.audience.is_empty() {
            String::new()
        } else {
            format!("Participants: {}", extraction.audience)
        };
        let intent_text = if extraction.intent.is_empty() {
            String::new()
        } else {
            format!("User intent: {}", extraction.intent)
        };
        budget.charge(token::count(&audience_text));
        budget.charge(token::count(&intent_text));

        // ── Memory ─────────────────────────────────────────────────────
        let user_line = history::format_line(user_message);
        let user_cost = token::context_count(PromptRole::User, &user_line);

        let memory_budget = (budget.remaining().saturating_sub(user_cost) as f64
            * self.options.memory_fraction) as usize;
        let topic = if extraction.intent.is_empty() {
            user_message.content.as_str()
        } else {
            extraction.intent.as_str()
        };
        let (memory_text, citations) =
            match self.retriever.query(topic, chat_id, memory_budget).await {
                Ok(result) => result,
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "Memory retrieval failed, continuing without");
                    (String::new(), CitationMap::new())
                }
            };
        budget.charge(token::count(&memory_text));

        // ── History ────────────────────────────────────────────────────
        let mut messages = vec![PromptMessage::system(system_instructions.clone())];
        if !audience_text.is_empty() {
            messages.push(PromptMessage::system(audience_text));
        }
        if !intent_text.is_empty() {
            messages.push(PromptMessage::system(intent_text));
        }
        if !memory_text.is_empty() {
            messages.push(PromptMessage::system(memory_text.clone()));
        }

        let history_text = self
            .history
            .allot(chat_id, budget.remaining(), Some(&mut messages))
            .await?;
        budget.charge(token::count(&history_text));

        // ── Finalize ───────────────────────────────────────────────────
        messages.push(PromptMessage::user(user_line));

        debug!(
            chat_id = %chat_id,
            tokens_used = budget.used(),
            ceiling = budget.ceiling(),
            "Prompt assembled"
        );

        Ok(Assembly {
            bundle: PromptBundle {
                system_instructions,
                audience: extraction.audience,
                user_intent: extraction.intent,
                memory_text,
                history_text,
                messages,
            },
            citations,
            token_usage: extraction.token_usage,
        })
    }
}
