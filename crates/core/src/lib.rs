//! # Mimir Core
//!
//! Domain types, traits, and error definitions for the Mimir RAG chat
//! assistant. This crate defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the turn pipeline depends on — completion service,
//! chat store, document index, push channel, sanitizer — is defined as a
//! trait here. Implementations live in their respective crates (or outside
//! the workspace entirely). This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod completion;
pub mod error;
pub mod message;
pub mod push;
pub mod sanitize;
pub mod search;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use completion::{
    CompletionDelta, CompletionRequest, CompletionResponse, CompletionService,
    CompletionSettings, ReasoningEffort, TokenUsage,
};
pub use error::{CompletionError, Error, PushError, Result, SearchError, StoreError};
pub use message::{
    AuthorRole, ChatId, ChatMessage, ChatSession, CitationMap, CitationSource, DocumentSource,
    MessageType, PromptBundle, PromptMessage, PromptRole,
};
pub use push::{BroadcastPush, NoopPush, PushChannel, PushEvent};
pub use sanitize::{Sanitized, Sanitizer};
pub use search::{DocumentIndex, SearchHit, SearchQuery, SearchScope};
pub use store::ChatStore;
