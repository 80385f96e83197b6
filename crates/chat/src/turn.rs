//! The chat turn — one user message in, one streamed bot response out.
//!
//! A turn is a single asynchronous task: persist the user message, create
//! the streaming bot placeholder, assemble the prompt, stream the
//! completion through the reasoning parser with throttled client pushes,
//! then finalize and upsert the bot message. Turns on the same chat are
//! serialized by the caller awaiting each turn to completion; turns on
//! different chats are fully independent.
//!
//! Cancellation is drop-based: dropping the `run` future mid-stream
//! performs no further upserts, leaving only the initial placeholder.

use crate::assembler::PromptAssembler;
use crate::stream::{PushThrottle, StreamParser};
use mimir_config::PromptOptions;
use mimir_core::completion::{
    CompletionRequest, CompletionService, CompletionSettings, ReasoningEffort, TokenUsage,
};
use mimir_core::error::{Error, StoreError};
use mimir_core::message::{ChatId, ChatMessage};
use mimir_core::push::PushChannel;
use mimir_core::sanitize::Sanitizer;
use mimir_core::search::DocumentIndex;
use mimir_core::store::ChatStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The incoming user message for one turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub chat_id: ChatId,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Runs chat turns against a set of collaborators.
pub struct ChatTurn {
    store: Arc<dyn ChatStore>,
    completion: Arc<dyn CompletionService>,
    push: Arc<dyn PushChannel>,
    assembler: PromptAssembler,
    options: PromptOptions,
}

impl ChatTurn {
    pub fn new(
        store: Arc<dyn ChatStore>,
        index: Arc<dyn DocumentIndex>,
        completion: Arc<dyn CompletionService>,
        push: Arc<dyn PushChannel>,
        options: PromptOptions,
    ) -> Self {
        let assembler = PromptAssembler::new(
            store.clone(),
            index,
            completion.clone(),
            options.clone(),
        );
        Self {
            store,
            completion,
            push,
            assembler,
            options,
        }
    }

    /// Attach an optional PII sanitizer for retrieved passages.
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.assembler = self.assembler.with_sanitizer(sanitizer);
        self
    }

    /// Process one user message and return the finalized bot message.
    pub async fn run(&self, input: TurnInput) -> Result<ChatMessage, Error> {
        let session = self
            .store
            .find_session(&input.chat_id)
            .await?
            .ok_or_else(|| StoreError::ChatNotFound(input.chat_id.to_string()))?;

        info!(chat_id = %input.chat_id, model = %session.model_id, "Processing chat turn");

        // ── Persist the user message ───────────────────────────────────
        let user_message = ChatMessage::user(
            input.chat_id.clone(),
            &input.user_id,
            &input.user_name,
            &input.content,
        );
        self.store.create_message(user_message.clone()).await?;
        // An unreachable push channel at message creation is a setup
        // error, so this failure aborts the turn.
        self.push_created(&user_message).await?;

        // ── Create the streaming placeholder ───────────────────────────
        let mut bot_message = ChatMessage::bot(input.chat_id.clone(), "");
        self.store.create_message(bot_message.clone()).await?;
        self.push_created(&bot_message).await?;

        // ── Assemble the prompt ────────────────────────────────────────
        let assembly = self
            .assembler
            .assemble(&session, &user_message, input.reasoning_effort)
            .await?;

        // ── Stream the completion ──────────────────────────────────────
        let request = CompletionRequest {
            model: session.model_id.clone(),
            messages: assembly.bundle.messages.clone(),
            settings: CompletionSettings {
                max_response_tokens: self.options.response_token_reserve as u32,
                reasoning_effort: input.reasoning_effort,
                ..CompletionSettings::default()
            },
        };

        let mut rx = self.completion.stream(request).await?;
        let mut parser = StreamParser::new();
        let mut throttle = PushThrottle::new(
            Duration::from_millis(self.options.stream_throttle.min_interval_ms),
            self.options.stream_throttle.max_buffered_deltas,
        );
        let mut usage: Option<TokenUsage> = None;

        while let Some(delta) = rx.recv().await {
            let delta = delta?;
            if let Some(content) = &delta.content {
                parser.feed(content);
            }
            if let Some(delta_usage) = delta.usage {
                usage = Some(delta_usage);
            }

            if throttle.ready() {
                self.push_update(&bot_message.id, &session.id, &parser).await;
            }

            if delta.done {
                break;
            }
        }

        // ── Finalize ───────────────────────────────────────────────────
        let (reasoning, content) = parser.finish();
        if input.reasoning_effort.is_some() && reasoning.is_none() {
            warn!(
                chat_id = %input.chat_id,
                "Reasoning was requested but the response contained no thinking block"
            );
        }

        bot_message.content = content;
        bot_message.reasoning = reasoning;
        bot_message.citations = assembly.citations.into_vec();
        bot_message.token_usage = assembly.token_usage;
        if let Some(usage) = usage {
            bot_message
                .token_usage
                .insert("chat".to_string(), usage.completion_tokens);
        }

        self.store.upsert_message(bot_message.clone()).await?;
        self.push_final(&bot_message).await;

        info!(
            chat_id = %input.chat_id,
            message_id = %bot_message.id,
            citations = bot_message.citations.len(),
            has_reasoning = bot_message.reasoning.is_some(),
            "Chat turn complete"
        );

        Ok(bot_message)
    }

    /// Announce a newly created message. Failures propagate: see `run`.
    async fn push_created(&self, message: &ChatMessage) -> Result<(), Error> {
        let payload = serde_json::to_value(message)?;
        self.push
            .send(&message.chat_id.0, "message_created", payload)
            .await?;
        Ok(())
    }

    /// Push a partial update mid-stream. Best-effort: failures are logged
    /// and swallowed so a flaky client connection cannot abort the turn.
    async fn push_update(&self, message_id: &str, chat_id: &ChatId, parser: &StreamParser) {
        let payload = serde_json::json!({
            "id": message_id,
            "content": parser.content(),
            "reasoning": parser.reasoning(),
        });
        if let Err(e) = self.push.send(&chat_id.0, "message_updated", payload).await {
            warn!(chat_id = %chat_id, error = %e, "Partial update push failed");
        }
    }

    /// Push the finalized message. Best-effort, like `push_update`.
    async fn push_final(&self, message: &ChatMessage) {
        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize final message payload");
                return;
            }
        };
        if let Err(e) = self
            .push
            .send(&message.chat_id.0, "message_updated", payload)
            .await
        {
            warn!(chat_id = %message.chat_id, error = %e, "Final update push failed");
        }
    }
}
