//! Sanitizer trait — optional PII redaction for prompt text.
//!
//! Sanitization applies to the copy of a passage used in the prompt, not
//! to stored data. The capability is optional: retrievers hold an
//! `Option<Arc<dyn Sanitizer>>` and treat absence as a no-op.

/// The result of sanitizing a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The text with detected spans redacted in place
    pub text: String,

    /// Names of the PII categories that were detected (empty = clean)
    pub categories: Vec<String>,
}

impl Sanitized {
    /// A pass-through result for text with no detections.
    pub fn clean(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            categories: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.categories.is_empty()
    }
}

/// The core Sanitizer trait. Implementations must be pure with respect to
/// their input: same text in, same redaction out.
pub trait Sanitizer: Send + Sync {
    /// The sanitizer name (e.g. "regex").
    fn name(&self) -> &str;

    /// Redact detected PII spans, reporting which categories matched.
    fn sanitize(&self, text: &str) -> Sanitized;
}
