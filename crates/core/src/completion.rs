//! CompletionService trait — the abstraction over LLM backends.
//!
//! A completion service knows how to turn a prepared prompt into a
//! response, either as a complete text or as a stream of deltas. The
//! concrete HTTP adapters live outside this workspace; the turn pipeline
//! calls `complete()` or `stream()` without knowing which backend serves
//! the request.

pub use crate::error::CompletionError;
use crate::message::PromptMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reasoning effort hint for models with native reasoning support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// The instruction string prefixed to the persona when the active
    /// model supports native reasoning.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Low => "Think briefly before answering.",
            Self::Medium => "Think carefully before answering.",
            Self::High => "Think very carefully and thoroughly before answering.",
        }
    }
}

/// Sampling and limit settings for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    /// Cap on generated response tokens
    pub max_response_tokens: u32,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling parameter
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Optional reasoning-effort hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_response_tokens: 1024,
            temperature: default_temperature(),
            top_p: default_top_p(),
            reasoning_effort: None,
        }
    }
}

/// A prepared request for the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (from the chat session)
    pub model: String,

    /// The structured prompt, chronological order
    pub messages: Vec<PromptMessage>,

    /// Sampling settings and limits
    pub settings: CompletionSettings,
}

/// Token usage reported by the completion-service adapter.
///
/// Adapters are responsible for populating this from whatever shape their
/// provider returns; the core never inspects provider responses directly.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A complete (non-streaming) response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,

    /// Token usage, when the adapter reports it
    pub usage: Option<TokenUsage>,
}

/// A single delta in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionDelta {
    /// Partial text content
    #[serde(default)]
    pub content: Option<String>,

    /// Usage info (typically only in the final delta)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Whether this is the final delta
    #[serde(default)]
    pub done: bool,
}

/// The core CompletionService trait.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// A human-readable name for this service (e.g. "azure-openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CompletionError>;

    /// Send a request and get a stream of response deltas.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single final delta.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<CompletionDelta, CompletionError>>,
        CompletionError,
    > {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(CompletionDelta {
                content: Some(response.text),
                usage: response.usage,
                done: true,
            }))
            .await;
        Ok(rx)
    }
}
