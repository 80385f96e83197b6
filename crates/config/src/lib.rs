//! Prompt-assembly configuration for Mimir.
//!
//! `PromptOptions` is an immutable value: the turn pipeline receives a
//! clone per invocation and nothing mutates shared state across concurrent
//! turns. Loaded from a TOML file with environment variable overrides,
//! validated at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Token ceilings, prompt text, and streaming policy for prompt assembly.
///
/// Maps directly to `mimir.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOptions {
    /// Context window of the completion model, in tokens
    #[serde(default = "default_completion_token_limit")]
    pub completion_token_limit: usize,

    /// Tokens reserved for the model's response
    #[serde(default = "default_response_token_reserve")]
    pub response_token_reserve: usize,

    /// Tokens reserved for tool/function call framing
    #[serde(default = "default_tool_call_token_reserve")]
    pub tool_call_token_reserve: usize,

    /// Fixed overhead claimed by the completion framework itself
    #[serde(default = "default_framework_token_overhead")]
    pub framework_token_overhead: usize,

    /// Fraction of the remaining budget granted to memory retrieval,
    /// reserving headroom for chat history. Must be in (0, 1).
    #[serde(default = "default_memory_fraction")]
    pub memory_fraction: f64,

    /// Minimum relevance score for non-pinned retrieval hits
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Maximum hits requested per index search
    #[serde(default = "default_document_search_limit")]
    pub document_search_limit: usize,

    /// Maximum messages fetched for history allotment
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// The user ID that marks an anonymous caller (auth disabled).
    /// Audience extraction is skipped for this identity and history
    /// preambles omit the author name.
    #[serde(default = "default_anonymous_user_id")]
    pub anonymous_user_id: String,

    /// Static instruction prefix, byte-identical across all requests and
    /// rendered first so downstream prompt caching can reuse it
    #[serde(default = "default_static_instructions")]
    pub static_instructions: String,

    /// Instruction for the intent-extraction completion call
    #[serde(default = "default_intent_instructions")]
    pub intent_instructions: String,

    /// Instruction for the audience-extraction completion call
    #[serde(default = "default_audience_instructions")]
    pub audience_instructions: String,

    /// Streaming push throttle policy
    #[serde(default)]
    pub stream_throttle: StreamThrottleOptions,
}

fn default_completion_token_limit() -> usize {
    4096
}
fn default_response_token_reserve() -> usize {
    1024
}
fn default_tool_call_token_reserve() -> usize {
    256
}
fn default_framework_token_overhead() -> usize {
    64
}
fn default_memory_fraction() -> f64 {
    0.6
}
fn default_relevance_threshold() -> f64 {
    0.7
}
fn default_document_search_limit() -> usize {
    100
}
fn default_history_window() -> usize {
    100
}
fn default_anonymous_user_id() -> String {
    "default-user".into()
}
fn default_static_instructions() -> String {
    concat!(
        "You are Mimir, a chat assistant grounded in the documents the user ",
        "has shared. Answer from the provided memory snippets when they are ",
        "relevant and say so when they are not. Be concise and accurate.",
    )
    .into()
}
fn default_intent_instructions() -> String {
    concat!(
        "Rewrite the last message to reflect the user's intent, taking the ",
        "chat history into consideration. Output a single rewritten ",
        "sentence and nothing else.",
    )
    .into()
}
fn default_audience_instructions() -> String {
    concat!(
        "List the names of the people who have spoken in this chat so far. ",
        "Output a single comma-separated list of names and nothing else.",
    )
    .into()
}

/// Rate limiting for partial-response pushes during streaming.
/// Bounds client update frequency, not provider throughput.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamThrottleOptions {
    /// Minimum milliseconds between partial pushes
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Push at least every N buffered deltas regardless of the interval
    #[serde(default = "default_max_buffered_deltas")]
    pub max_buffered_deltas: usize,
}

fn default_min_interval_ms() -> u64 {
    250
}
fn default_max_buffered_deltas() -> usize {
    8
}

impl Default for StreamThrottleOptions {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            max_buffered_deltas: default_max_buffered_deltas(),
        }
    }
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            completion_token_limit: default_completion_token_limit(),
            response_token_reserve: default_response_token_reserve(),
            tool_call_token_reserve: default_tool_call_token_reserve(),
            framework_token_overhead: default_framework_token_overhead(),
            memory_fraction: default_memory_fraction(),
            relevance_threshold: default_relevance_threshold(),
            document_search_limit: default_document_search_limit(),
            history_window: default_history_window(),
            anonymous_user_id: default_anonymous_user_id(),
            static_instructions: default_static_instructions(),
            intent_instructions: default_intent_instructions(),
            audience_instructions: default_audience_instructions(),
            stream_throttle: StreamThrottleOptions::default(),
        }
    }
}

impl PromptOptions {
    /// Load options from the default path (`./mimir.toml`), falling back to
    /// defaults when the file is absent.
    ///
    /// Environment variable overrides (highest priority):
    /// - `MIMIR_COMPLETION_TOKEN_LIMIT`
    /// - `MIMIR_MEMORY_FRACTION`
    pub fn load() -> Result<Self, ConfigError> {
        let mut options = Self::load_from(Path::new("mimir.toml"))?;

        if let Ok(limit) = std::env::var("MIMIR_COMPLETION_TOKEN_LIMIT") {
            options.completion_token_limit =
                limit.parse().map_err(|_| ConfigError::ValidationError(
                    format!("MIMIR_COMPLETION_TOKEN_LIMIT is not an integer: {limit}"),
                ))?;
        }
        if let Ok(fraction) = std::env::var("MIMIR_MEMORY_FRACTION") {
            options.memory_fraction =
                fraction.parse().map_err(|_| ConfigError::ValidationError(
                    format!("MIMIR_MEMORY_FRACTION is not a number: {fraction}"),
                ))?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Load options from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let options: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        options.validate()?;
        Ok(options)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_fraction <= 0.0 || self.memory_fraction >= 1.0 {
            return Err(ConfigError::ValidationError(
                "memory_fraction must be strictly between 0 and 1".into(),
            ));
        }

        let reserved = self.framework_token_overhead
            + self.response_token_reserve
            + self.tool_call_token_reserve;
        if reserved >= self.completion_token_limit {
            return Err(ConfigError::ValidationError(format!(
                "reserves ({} tokens) leave no prompt budget within completion_token_limit ({})",
                reserved, self.completion_token_limit
            )));
        }

        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::ValidationError(
                "relevance_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "history_window must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// The prompt token ceiling available after fixed reserves.
    ///
    /// Every downstream consumer depletes this sequentially through a
    /// running used-token counter.
    pub fn prompt_ceiling(&self) -> usize {
        self.completion_token_limit
            - self.framework_token_overhead
            - self.response_token_reserve
            - self.tool_call_token_reserve
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
