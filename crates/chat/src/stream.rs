//! Response parsing — separating `<thinking>` reasoning from visible
//! content, for complete responses and incremental streams.
//!
//! The streaming variant is an explicit two-state automaton over an
//! append-only buffer: `Scanning` accumulates visible content while
//! watching for an opening tag, `InsideThinking` accumulates reasoning
//! while watching for the closing tag. Partial tag text at a chunk
//! boundary is held back and never surfaces on the content channel.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tokio::time::Instant;

static THINKING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<thinking>(.*?)</thinking>").expect("Invalid regex"));

const OPEN_TAG: &str = "<thinking>";
const CLOSE_TAG: &str = "</thinking>";

/// Parse a complete response, splitting out the first reasoning block.
///
/// Returns `(reasoning, clean_content)`. When no tag is present the input
/// is returned unmodified with `None` reasoning. When a tag is found, the
/// reasoning is the trimmed inner text of the first block and the content
/// is the input with all blocks removed, trimmed.
pub fn parse_response(text: &str) -> (Option<String>, String) {
    let Some(captures) = THINKING_RE.captures(text) else {
        return (None, text.to_string());
    };

    let reasoning = captures[1].trim().to_string();
    let content = THINKING_RE.replace_all(text, "").trim().to_string();
    (Some(reasoning), content)
}

/// Case-insensitive ASCII substring search. The tags are pure ASCII, so
/// byte offsets stay valid for the original string.
fn find_tag(haystack: &str, tag: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let tag = tag.as_bytes();
    if haystack.len() < tag.len() {
        return None;
    }
    (0..=haystack.len() - tag.len())
        .find(|&i| haystack[i..i + tag.len()].eq_ignore_ascii_case(tag))
}

/// Length of the longest suffix of `text` that could grow into `tag` with
/// more input. That suffix must be held back rather than flushed.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    let bytes = text.as_bytes();
    let tag = tag.as_bytes();
    let max = bytes.len().min(tag.len() - 1);
    for len in (1..=max).rev() {
        if bytes[bytes.len() - len..].eq_ignore_ascii_case(&tag[..len]) {
            return len;
        }
    }
    0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Scanning,
    InsideThinking,
}

/// Incremental reasoning-tag parser for streamed responses.
pub struct StreamParser {
    state: ParserState,
    /// Unclassified tail that may still contain a partial tag
    pending: String,
    content: String,
    reasoning: String,
    saw_thinking: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Scanning,
            pending: String::new(),
            content: String::new(),
            reasoning: String::new(),
            saw_thinking: false,
        }
    }

    /// Feed one raw chunk from the stream.
    pub fn feed(&mut self, chunk: &str) {
        self.pending.push_str(chunk);

        loop {
            match self.state {
                ParserState::Scanning => {
                    if let Some(idx) = find_tag(&self.pending, OPEN_TAG) {
                        self.content.push_str(&self.pending[..idx]);
                        self.pending.drain(..idx + OPEN_TAG.len());
                        self.state = ParserState::InsideThinking;
                        self.saw_thinking = true;
                        continue;
                    }
                    let hold = partial_tag_suffix(&self.pending, OPEN_TAG);
                    let flush = self.pending.len() - hold;
                    self.content.push_str(&self.pending[..flush]);
                    self.pending.drain(..flush);
                    break;
                }
                ParserState::InsideThinking => {
                    if let Some(idx) = find_tag(&self.pending, CLOSE_TAG) {
                        self.reasoning.push_str(&self.pending[..idx]);
                        self.pending.drain(..idx + CLOSE_TAG.len());
                        self.state = ParserState::Scanning;
                        continue;
                    }
                    let hold = partial_tag_suffix(&self.pending, CLOSE_TAG);
                    let flush = self.pending.len() - hold;
                    self.reasoning.push_str(&self.pending[..flush]);
                    self.pending.drain(..flush);
                    break;
                }
            }
        }
    }

    /// Visible content classified so far (safe to push to clients).
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Reasoning classified so far.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Whether the stream is currently inside a reasoning block.
    pub fn in_thinking(&self) -> bool {
        self.state == ParserState::InsideThinking
    }

    /// Finish the stream and return `(reasoning, content)`.
    ///
    /// A `<thinking>` block left unclosed at stream end is flushed as
    /// reasoning — incomplete reasoning beats silently dropped content.
    /// A held-back partial tag in `Scanning` state was never a tag, so it
    /// flushes as content.
    pub fn finish(mut self) -> (Option<String>, String) {
        match self.state {
            ParserState::Scanning => self.content.push_str(&self.pending),
            ParserState::InsideThinking => self.reasoning.push_str(&self.pending),
        }

        let reasoning = if self.saw_thinking {
            Some(self.reasoning.trim().to_string())
        } else {
            None
        };
        (reasoning, self.content.trim().to_string())
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate limiter for partial-response pushes.
///
/// Emission is allowed when either the minimum interval has elapsed or
/// enough deltas have buffered up. This bounds client update frequency,
/// not provider throughput.
pub struct PushThrottle {
    min_interval: Duration,
    max_buffered: usize,
    last_emit: Option<Instant>,
    buffered: usize,
}

impl PushThrottle {
    pub fn new(min_interval: Duration, max_buffered: usize) -> Self {
        Self {
            min_interval,
            max_buffered: max_buffered.max(1),
            last_emit: None,
            buffered: 0,
        }
    }

    /// Record one delta; returns whether an update should be emitted now.
    pub fn ready(&mut self) -> bool {
        self.buffered += 1;

        let interval_elapsed = match self.last_emit {
            Some(at) => at.elapsed() >= self.min_interval,
            None => true,
        };

        if interval_elapsed || self.buffered >= self.max_buffered {
            self.last_emit = Some(Instant::now());
            self.buffered = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Batch parse ────────────────────────────────────────────────────

    #[test]
    fn parse_roundtrip() {
        let (reasoning, content) =
            parse_response("<thinking> weigh the options </thinking> The answer is 42.");
        assert_eq!(reasoning.as_deref(), Some("weigh the options"));
        assert_eq!(content, "The answer is 42.");
    }

    #[test]
    fn parse_without_tag_is_unmodified() {
        let input = "  plain answer with leading spaces";
        let (reasoning, content) = parse_response(input);
        assert!(reasoning.is_none());
        assert_eq!(content, input);
    }

    #[test]
    fn parse_is_case_insensitive() {
        let (reasoning, content) = parse_response("<THINKING>loud</Thinking>done");
        assert_eq!(reasoning.as_deref(), Some("loud"));
        assert_eq!(content, "done");
    }

    #[test]
    fn parse_allows_embedded_newlines() {
        let (reasoning, _) = parse_response("<thinking>line one\nline two</thinking>ok");
        assert_eq!(reasoning.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn parse_removes_all_blocks_keeps_first_reasoning() {
        let (reasoning, content) =
            parse_response("<thinking>first</thinking>a<thinking>second</thinking>b");
        assert_eq!(reasoning.as_deref(), Some("first"));
        assert_eq!(content, "ab");
    }

    // ── Streaming parser ───────────────────────────────────────────────

    fn run_chunks(chunks: &[&str]) -> (Option<String>, String) {
        let mut parser = StreamParser::new();
        for chunk in chunks {
            parser.feed(chunk);
        }
        parser.finish()
    }

    #[test]
    fn chunk_boundaries_inside_tags() {
        let (reasoning, content) = run_chunks(&["ab<th", "inking>xy</thi", "nking>cd"]);
        assert_eq!(reasoning.as_deref(), Some("xy"));
        assert_eq!(content, "abcd");
    }

    #[test]
    fn single_chunk_stream() {
        let (reasoning, content) = run_chunks(&["<thinking>plan</thinking>result"]);
        assert_eq!(reasoning.as_deref(), Some("plan"));
        assert_eq!(content, "result");
    }

    #[test]
    fn one_byte_chunks() {
        let text = "pre<thinking>deep thought</thinking>post";
        let chunks: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let mut parser = StreamParser::new();
        for chunk in &chunks {
            parser.feed(chunk);
        }
        let (reasoning, content) = parser.finish();
        assert_eq!(reasoning.as_deref(), Some("deep thought"));
        assert_eq!(content, "prepost");
    }

    #[test]
    fn no_tag_stream() {
        let (reasoning, content) = run_chunks(&["just ", "plain ", "text"]);
        assert!(reasoning.is_none());
        assert_eq!(content, "just plain text");
    }

    #[test]
    fn partial_tag_never_surfaces_as_content() {
        let mut parser = StreamParser::new();
        parser.feed("hello <thin");
        // The possible tag prefix is held back from the content channel.
        assert_eq!(parser.content(), "hello ");
        parser.feed("king>secret</thinking> world");
        assert_eq!(parser.content(), "hello  world");
        assert_eq!(parser.reasoning(), "secret");
    }

    #[test]
    fn false_tag_prefix_flushes_as_content() {
        let (reasoning, content) = run_chunks(&["a <thin slice of text"]);
        assert!(reasoning.is_none());
        assert_eq!(content, "a <thin slice of text");
    }

    #[test]
    fn unclosed_thinking_flushes_as_reasoning() {
        let (reasoning, content) = run_chunks(&["before<thinking>never closed"]);
        assert_eq!(reasoning.as_deref(), Some("never closed"));
        assert_eq!(content, "before");
    }

    #[test]
    fn streaming_is_case_insensitive() {
        let (reasoning, content) = run_chunks(&["<ThInKiNg>x</THINKING>y"]);
        assert_eq!(reasoning.as_deref(), Some("x"));
        assert_eq!(content, "y");
    }

    #[test]
    fn in_thinking_reports_state() {
        let mut parser = StreamParser::new();
        parser.feed("a<thinking>b");
        assert!(parser.in_thinking());
        parser.feed("</thinking>c");
        assert!(!parser.in_thinking());
    }

    // ── Throttle ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn first_delta_emits_immediately() {
        let mut throttle = PushThrottle::new(Duration::from_millis(250), 8);
        assert!(throttle.ready());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_gates_emission() {
        let mut throttle = PushThrottle::new(Duration::from_millis(250), 100);
        assert!(throttle.ready());
        assert!(!throttle.ready());

        tokio::time::advance(Duration::from_millis(251)).await;
        assert!(throttle.ready());
    }

    #[tokio::test(start_paused = true)]
    async fn buffered_count_forces_emission() {
        let mut throttle = PushThrottle::new(Duration::from_secs(3600), 3);
        assert!(throttle.ready());
        assert!(!throttle.ready());
        assert!(!throttle.ready());
        // Third buffered delta since the last emit forces one.
        assert!(throttle.ready());
    }
}
