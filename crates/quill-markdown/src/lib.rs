//! quill-markdown: hand-written Markdown-to-HTML pipeline.
//!
//! Two passes over the source: block segmentation (a stateful line
//! scanner producing [`Block`] nodes) followed by inline transformation
//! (an ordered substitution pipeline per text run), finished by an HTML
//! sanitization pass. The parser is synchronous and pure; it never
//! panics on untrusted text, and oversized input yields a placeholder
//! instead of an error.

pub mod block;
pub mod emoji;
mod inline;
mod render;
pub mod sanitize;
pub mod slug;
pub mod stats;

pub use block::{Alignment, Block, ListItem, ListKind};
pub use sanitize::Sanitizer;
pub use slug::slugify;
pub use stats::{char_count, word_count};

use tracing::warn;

/// Default input ceiling: 10 MiB. Larger inputs get a placeholder.
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Parser configuration. Immutable once constructed; the parser owns it
/// (no process-wide mutable state).
#[derive(Clone, Copy, Debug)]
pub struct ParserConfig {
    /// Inputs larger than this render as a safe placeholder.
    pub max_input_bytes: usize,
    /// Sanitization strategy for the final pass.
    pub sanitizer: Sanitizer,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_INPUT_BYTES,
            sanitizer: Sanitizer::Allowlist,
        }
    }
}

/// The markdown parser. Construction compiles the inline pattern table;
/// reuse one instance across renders.
pub struct MarkdownParser {
    config: ParserConfig,
    rules: inline::InlineRules,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl MarkdownParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            rules: inline::InlineRules::new(),
        }
    }

    /// Convert markdown to sanitized HTML.
    ///
    /// Empty input produces empty output. Oversized input produces a
    /// placeholder paragraph, never an error: pathological inputs must
    /// not take down the render loop.
    pub fn parse(&self, markdown: &str) -> String {
        if markdown.is_empty() {
            return String::new();
        }
        if markdown.len() > self.config.max_input_bytes {
            warn!(
                len = markdown.len(),
                max = self.config.max_input_bytes,
                "input exceeds size ceiling, emitting placeholder"
            );
            return "<p class=\"parse-error\">Document too large to render.</p>".to_string();
        }

        let normalized = normalize_line_endings(markdown);
        let blocks = block::parse_blocks(&normalized);
        let html = render::render_blocks(&blocks, &self.rules);
        self.config.sanitizer.sanitize(&html)
    }

    /// Block segmentation only (no inline pass, no sanitization).
    pub fn parse_blocks(&self, markdown: &str) -> Vec<Block> {
        block::parse_blocks(&normalize_line_endings(markdown))
    }

    /// Heading outline: `(level, text, slug)` in document order.
    /// Duplicate slugs are reported as-is; consumers decide how to
    /// disambiguate.
    pub fn toc(&self, markdown: &str) -> Vec<(u8, String, String)> {
        self.parse_blocks(markdown)
            .into_iter()
            .filter_map(|b| match b {
                Block::Heading {
                    level, text, id, ..
                } => Some((level, text, id)),
                _ => None,
            })
            .collect()
    }
}

/// Normalize `\r\n` and bare `\r` to `\n` before scanning.
fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}
