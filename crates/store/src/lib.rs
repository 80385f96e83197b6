//! # Mimir Store
//!
//! In-memory reference implementations of the [`mimir_core::ChatStore`]
//! and [`mimir_core::DocumentIndex`] traits, used by tests and ephemeral
//! sessions. Durable backends (document databases, vector search services)
//! implement the same traits outside this workspace.

pub mod in_memory;
pub mod index;

pub use in_memory::InMemoryChatStore;
pub use index::{IndexedPassage, InMemoryDocumentIndex};
