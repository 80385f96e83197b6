//! # Mimir Chat
//!
//! The prompt-assembly and streaming turn pipeline — the core of the Mimir
//! RAG chat assistant:
//!
//! 1. **Token counting** ([`token`]) — character-heuristic estimates with
//!    per-message framing overhead
//! 2. **Turn budget** ([`budget`]) — sequential depletion of one prompt
//!    ceiling across assembly stages
//! 3. **History allotment** ([`history`]) — newest-first walk, chronological
//!    output, halt on budget exhaustion
//! 4. **Memory retrieval** ([`retriever`]) — citation-aware, pinned-document
//!    handling, optional PII sanitization
//! 5. **Extraction** ([`extract`]) — concurrent intent/audience completion
//!    calls
//! 6. **Assembly** ([`assembler`]) — the stage orchestrator producing a
//!    [`mimir_core::PromptBundle`]
//! 7. **Stream parsing** ([`stream`]) — reasoning-tag separation for batch
//!    and incremental responses, with push throttling
//! 8. **The turn** ([`turn`]) — message persistence, streaming, and
//!    client pushes end to end

pub mod assembler;
pub mod budget;
pub mod extract;
pub mod history;
pub mod retriever;
pub mod sanitize;
pub mod stream;
pub mod token;
pub mod turn;

pub use assembler::{Assembly, PromptAssembler};
pub use budget::TurnBudget;
pub use extract::{Extraction, IntentExtractor};
pub use history::HistoryAllotter;
pub use retriever::MemoryRetriever;
pub use sanitize::RegexSanitizer;
pub use stream::{parse_response, PushThrottle, StreamParser};
pub use turn::{ChatTurn, TurnInput};
