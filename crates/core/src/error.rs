//! Error types for the Mimir domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Propagation policy: only NotFound-class store errors abort a chat turn.
//! Degraded-retrieval and update-time push failures are caught at the call
//! site, logged, and the turn continues with reduced functionality.

use thiserror::Error;

/// The top-level error type for all Mimir operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion service errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Chat store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Document search errors ---
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    // --- Push channel errors ---
    #[error("Push error: {0}")]
    Push(#[from] PushError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is a NotFound-class failure that should surface
    /// to the caller as a turn-level failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::ChatNotFound(_)) | Error::Store(StoreError::MessageNotFound(_))
        )
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Completion service not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Chat does not exist: {0}")]
    ChatNotFound(String),

    #[error("Message does not exist: {0}")]
    MessageNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("Push channel not configured: {0}")]
    NotConfigured(String),

    #[error("Delivery failed to group {group}: {reason}")]
    DeliveryFailed { group: String, reason: String },

    #[error("Push connection lost: {0}")]
    ConnectionLost(String),
}
