//! Intent and audience extraction — lightweight completion calls that
//! summarize the user's goal and, in multi-user chats, who is speaking.
//!
//! The two extractions are independent reads of the same context, so they
//! run concurrently and are joined before prompt assembly proceeds.
//! Audience extraction only runs for authenticated callers; the anonymous
//! default identity has no participant list worth summarizing.

use crate::history::HistoryAllotter;
use crate::token;
use mimir_config::PromptOptions;
use mimir_core::completion::{
    CompletionRequest, CompletionService, CompletionSettings, TokenUsage,
};
use mimir_core::error::Error;
use mimir_core::message::{ChatId, PromptMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The result of the extraction stage.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// One-line summary of what the user wants
    pub intent: String,

    /// Participant summary ("" when extraction was skipped)
    pub audience: String,

    /// Tokens spent per extraction, keyed by consumer name
    pub token_usage: HashMap<String, u64>,
}

/// Runs the extraction completion calls.
pub struct IntentExtractor {
    completion: Arc<dyn CompletionService>,
    history: Arc<HistoryAllotter>,
    options: PromptOptions,
}

impl IntentExtractor {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        history: Arc<HistoryAllotter>,
        options: PromptOptions,
    ) -> Self {
        Self {
            completion,
            history,
            options,
        }
    }

    /// Extract intent (and audience for authenticated callers) for the new
    /// user message. Both extractions run concurrently.
    pub async fn extract(
        &self,
        model: &str,
        chat_id: &ChatId,
        user_message: &str,
        anonymous: bool,
    ) -> Result<Extraction, Error> {
        let (intent, audience) = tokio::join!(
            self.run_extraction(
                model,
                chat_id,
                &self.options.intent_instructions,
                Some(user_message),
            ),
            async {
                if anonymous {
                    Ok(None)
                } else {
                    self.run_extraction(
                        model,
                        chat_id,
                        &self.options.audience_instructions,
                        None,
                    )
                    .await
                    .map(Some)
                }
            }
        );

        let (intent, intent_usage) = intent?;
        let mut token_usage = HashMap::new();
        token_usage.insert("intent".to_string(), intent_usage.completion_tokens);

        let audience = match audience? {
            Some((text, usage)) => {
                token_usage.insert("audience".to_string(), usage.completion_tokens);
                text
            }
            None => String::new(),
        };

        debug!(chat_id = %chat_id, intent = %intent, "Extraction complete");

        Ok(Extraction {
            intent,
            audience,
            token_usage,
        })
    }

    /// One extraction call: instructions, as much history as the sub-call
    /// budget allows, and optionally the new user message.
    async fn run_extraction(
        &self,
        model: &str,
        chat_id: &ChatId,
        instructions: &str,
        user_message: Option<&str>,
    ) -> Result<(String, TokenUsage), Error> {
        // Ceiling reserved for this sub-step: whatever the model window
        // allows after the response reserve and the instruction text.
        let ceiling = self
            .options
            .completion_token_limit
            .saturating_sub(self.options.response_token_reserve)
            .saturating_sub(token::count(instructions))
            .saturating_sub(user_message.map(token::count).unwrap_or(0));

        let history_text = self.history.allot(chat_id, ceiling, None).await?;

        let mut messages = vec![
            PromptMessage::system(instructions),
            PromptMessage::user(history_text),
        ];
        if let Some(message) = user_message {
            messages.push(PromptMessage::user(message));
        }

        let response = self
            .completion
            .complete(CompletionRequest {
                model: model.to_string(),
                messages,
                settings: CompletionSettings {
                    max_response_tokens: self.options.response_token_reserve as u32,
                    temperature: 0.0,
                    ..CompletionSettings::default()
                },
            })
            .await?;

        Ok((
            response.text.trim().to_string(),
            response.usage.unwrap_or_default(),
        ))
    }
}
