//! Block segmentation: a single forward scan over source lines.
//!
//! The scanner keeps one explicit state at a time (fence, table, quote,
//! list, or plain text) plus an accumulator for the block being built.
//! Every non-blank input line lands in exactly one block; blank lines
//! belong to no block and only terminate whatever is open.

use smol_str::SmolStr;

/// Column alignment for a table, derived from the separator row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// The kind of list a run of items forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Unordered,
    /// Ordered list; `start` is the first item's declared number.
    /// Later numbers are preserved in items but not auto-corrected.
    Ordered {
        start: u64,
    },
    Task,
}

/// A single list item as written in the source.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ListItem {
    /// Leading whitespace width in chars (for indent rendering).
    pub indent: usize,
    /// Item text with the marker stripped.
    pub content: String,
    /// `Some(done)` for task items, `None` otherwise.
    pub checked: Option<bool>,
    /// Declared number for ordered items.
    pub number: Option<u64>,
}

/// A structural markdown unit spanning one or more source lines.
///
/// `source_line` is the 0-based index of the block's first source line,
/// kept for click-to-scroll sync between editor and preview.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        id: String,
        source_line: usize,
    },
    CodeBlock {
        language: Option<SmolStr>,
        content: String,
        source_line: usize,
    },
    Mermaid {
        code: String,
        source_line: usize,
    },
    Blockquote {
        blocks: Vec<Block>,
        source_line: usize,
    },
    List {
        kind: ListKind,
        items: Vec<ListItem>,
        source_line: usize,
    },
    Table {
        rows: Vec<Vec<String>>,
        alignments: Vec<Alignment>,
        source_line: usize,
    },
    HorizontalRule {
        source_line: usize,
    },
    Paragraph {
        text: String,
        source_line: usize,
    },
}

impl Block {
    /// First source line this block was scanned from.
    pub fn source_line(&self) -> usize {
        match self {
            Block::Heading { source_line, .. }
            | Block::CodeBlock { source_line, .. }
            | Block::Mermaid { source_line, .. }
            | Block::Blockquote { source_line, .. }
            | Block::List { source_line, .. }
            | Block::Table { source_line, .. }
            | Block::HorizontalRule { source_line }
            | Block::Paragraph { source_line, .. } => *source_line,
        }
    }
}

/// Mutually exclusive scanner state. The accumulating payload lives in
/// the variant, so an illegal combination (e.g. "in a fence and in a
/// table") is unrepresentable.
enum State {
    Text,
    /// Inside a fenced code block. `mermaid` routes the fence to a
    /// diagram block instead of `<pre><code>`.
    Fence {
        language: Option<SmolStr>,
        mermaid: bool,
        lines: Vec<String>,
        start: usize,
    },
    Table {
        rows: Vec<Vec<String>>,
        alignments: Vec<Alignment>,
        start: usize,
    },
    Quote {
        lines: Vec<String>,
        start: usize,
    },
    List {
        kind: ListKind,
        items: Vec<ListItem>,
        start: usize,
    },
}

/// One parsed line classification, checked in priority order.
struct LineInfo<'a> {
    raw: &'a str,
    trimmed: &'a str,
    indent: usize,
}

impl<'a> LineInfo<'a> {
    fn new(raw: &'a str) -> Self {
        let trimmed = raw.trim_start();
        let indent = raw.chars().count() - trimmed.chars().count();
        Self {
            raw,
            trimmed: trimmed.trim_end(),
            indent,
        }
    }

    fn is_blank(&self) -> bool {
        self.trimmed.is_empty()
    }

    fn fence(&self) -> Option<&'a str> {
        self.trimmed.strip_prefix("```").map(str::trim)
    }

    fn heading(&self) -> Option<(u8, &'a str)> {
        if self.indent > 0 {
            return None;
        }
        let hashes = self.trimmed.chars().take_while(|&c| c == '#').count();
        if !(1..=6).contains(&hashes) {
            return None;
        }
        let rest = &self.trimmed[hashes..];
        rest.strip_prefix(' ')
            .map(|text| (hashes as u8, text.trim()))
    }

    fn horizontal_rule(&self) -> bool {
        let t = self.trimmed;
        t.len() >= 3
            && (t.chars().all(|c| c == '-')
                || t.chars().all(|c| c == '*')
                || t.chars().all(|c| c == '_'))
    }

    fn blockquote(&self) -> Option<&'a str> {
        self.trimmed
            .strip_prefix("> ")
            .or_else(|| self.trimmed.strip_prefix('>'))
    }

    fn task_item(&self) -> Option<(bool, &'a str)> {
        let rest = self.bullet_rest()?;
        let (mark, content) = rest
            .strip_prefix("[ ] ")
            .map(|c| (false, c))
            .or_else(|| rest.strip_prefix("[x] ").map(|c| (true, c)))
            .or_else(|| rest.strip_prefix("[X] ").map(|c| (true, c)))?;
        Some((mark, content))
    }

    fn bullet_rest(&self) -> Option<&'a str> {
        let t = self.trimmed;
        t.strip_prefix("- ")
            .or_else(|| t.strip_prefix("* "))
            .or_else(|| t.strip_prefix("+ "))
    }

    fn ordered_item(&self) -> Option<(u64, &'a str)> {
        let digits = self.trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let number: u64 = self.trimmed[..digits].parse().ok()?;
        self.trimmed[digits..]
            .strip_prefix(". ")
            .map(|content| (number, content))
    }

    /// Does this line look like a table row (`| ... |`)?
    fn table_row(&self) -> bool {
        self.trimmed.len() >= 2 && self.trimmed.starts_with('|') && self.trimmed.ends_with('|')
    }
}

/// Is a line a valid table separator row (`|---|:--:|...`)?
fn is_table_separator(trimmed: &str) -> bool {
    if !(trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() >= 2) {
        return false;
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| c == '-' || c == ':' || c == '|' || c.is_whitespace())
        && inner.contains('-')
}

fn split_row(trimmed: &str) -> Vec<String> {
    let inner = trimmed
        .strip_prefix('|')
        .unwrap_or(trimmed)
        .strip_suffix('|')
        .unwrap_or(trimmed);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn separator_alignments(trimmed: &str) -> Vec<Alignment> {
    split_row(trimmed)
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':');
            match (left, right) {
                (true, true) => Alignment::Center,
                (false, true) => Alignment::Right,
                // `:--` and bare `--` both render left.
                _ => Alignment::Left,
            }
        })
        .collect()
}

/// Scanner over source lines, producing blocks in document order.
pub(crate) struct BlockScanner {
    state: State,
    paragraph: Vec<String>,
    paragraph_start: usize,
    blocks: Vec<Block>,
}

impl BlockScanner {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Text,
            paragraph: Vec::new(),
            paragraph_start: 0,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn scan(mut self, input: &str) -> Vec<Block> {
        let lines: Vec<&str> = input.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let line = LineInfo::new(lines[i]);
            let next = lines.get(i + 1).map(|l| l.trim());
            i += self.step(line, next, i);
        }
        self.finish()
    }

    /// Consume one line (or two, for a table header + separator).
    /// Returns how many lines were consumed.
    fn step(&mut self, line: LineInfo<'_>, next: Option<&str>, n: usize) -> usize {
        // Fences swallow everything until the closing fence.
        if let State::Fence { lines, .. } = &mut self.state {
            if line.fence().is_some() {
                self.flush_state();
            } else {
                lines.push(line.raw.to_string());
            }
            return 1;
        }

        if let Some(lang) = line.fence() {
            self.flush_all();
            self.state = State::Fence {
                mermaid: lang.eq_ignore_ascii_case("mermaid"),
                language: if lang.is_empty() || lang.eq_ignore_ascii_case("mermaid") {
                    None
                } else {
                    Some(SmolStr::new(lang))
                },
                lines: Vec::new(),
                start: n,
            };
            return 1;
        }

        // Table continuation or start (header row + separator lookahead).
        if line.table_row() {
            if let State::Table { rows, .. } = &mut self.state {
                if !is_table_separator(line.trimmed) {
                    rows.push(split_row(line.trimmed));
                }
                return 1;
            }
            if let Some(sep) = next.filter(|sep| is_table_separator(sep)) {
                self.flush_all();
                self.state = State::Table {
                    rows: vec![split_row(line.trimmed)],
                    alignments: separator_alignments(sep),
                    start: n,
                };
                return 2;
            }
            // A lone pipe row without a separator is just a paragraph line.
        } else if matches!(self.state, State::Table { .. }) {
            self.flush_state();
        }

        if let Some(inner) = line.blockquote() {
            if let State::Quote { lines, .. } = &mut self.state {
                lines.push(inner.to_string());
            } else {
                self.flush_all();
                self.state = State::Quote {
                    lines: vec![inner.to_string()],
                    start: n,
                };
            }
            return 1;
        } else if matches!(self.state, State::Quote { .. }) {
            self.flush_state();
        }

        if let Some((level, text)) = line.heading() {
            self.flush_all();
            self.blocks.push(Block::Heading {
                level,
                id: crate::slug::slugify(text),
                text: text.to_string(),
                source_line: n,
            });
            return 1;
        }

        if line.horizontal_rule() {
            self.flush_all();
            self.blocks.push(Block::HorizontalRule { source_line: n });
            return 1;
        }

        if let Some((checked, content)) = line.task_item() {
            self.push_item(
                ListKind::Task,
                ListItem {
                    indent: line.indent,
                    content: content.to_string(),
                    checked: Some(checked),
                    number: None,
                },
                n,
            );
            return 1;
        }

        if let Some(content) = line.bullet_rest() {
            self.push_item(
                ListKind::Unordered,
                ListItem {
                    indent: line.indent,
                    content: content.to_string(),
                    checked: None,
                    number: None,
                },
                n,
            );
            return 1;
        }

        if let Some((number, content)) = line.ordered_item() {
            self.push_item(
                ListKind::Ordered { start: number },
                ListItem {
                    indent: line.indent,
                    content: content.to_string(),
                    checked: None,
                    number: Some(number),
                },
                n,
            );
            return 1;
        }

        // Any non-list line ends an open list.
        if matches!(self.state, State::List { .. }) {
            self.flush_state();
        }

        if line.is_blank() {
            self.flush_paragraph();
            return 1;
        }

        // Lazy continuation: contiguous plain lines merge into one paragraph.
        // Trailing whitespace is preserved so the inline pass can honor
        // trailing-double-space hard breaks.
        if self.paragraph.is_empty() {
            self.paragraph_start = n;
        }
        self.paragraph.push(line.raw.trim_start().to_string());
        1
    }

    fn push_item(&mut self, kind: ListKind, item: ListItem, n: usize) {
        match &mut self.state {
            State::List { kind: open, items, .. } if list_compatible(*open, kind) => {
                items.push(item);
            }
            _ => {
                self.flush_all();
                self.state = State::List {
                    kind,
                    items: vec![item],
                    start: n,
                };
            }
        }
    }

    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.blocks.push(Block::Paragraph {
                text: self.paragraph.join("\n"),
                source_line: self.paragraph_start,
            });
            self.paragraph.clear();
        }
    }

    /// Finalize whatever stateful block is open and emit it.
    fn flush_state(&mut self) {
        match std::mem::replace(&mut self.state, State::Text) {
            State::Text => {}
            State::Fence {
                language,
                mermaid,
                lines,
                start,
            } => {
                let content = lines.join("\n");
                if mermaid {
                    self.blocks.push(Block::Mermaid {
                        code: content,
                        source_line: start,
                    });
                } else {
                    self.blocks.push(Block::CodeBlock {
                        language,
                        content,
                        source_line: start,
                    });
                }
            }
            State::Table {
                rows,
                alignments,
                start,
            } => {
                self.blocks.push(Block::Table {
                    rows,
                    alignments,
                    source_line: start,
                });
            }
            State::Quote { lines, start } => {
                let inner = BlockScanner::new().scan(&lines.join("\n"));
                self.blocks.push(Block::Blockquote {
                    blocks: inner,
                    source_line: start,
                });
            }
            State::List { kind, items, start } => {
                self.blocks.push(Block::List {
                    kind,
                    items,
                    source_line: start,
                });
            }
        }
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.flush_state();
    }

    fn finish(mut self) -> Vec<Block> {
        // An unterminated fence still emits its buffered content.
        self.flush_all();
        self.blocks
    }
}

fn list_compatible(open: ListKind, incoming: ListKind) -> bool {
    matches!(
        (open, incoming),
        (ListKind::Unordered, ListKind::Unordered)
            | (ListKind::Task, ListKind::Task)
            | (ListKind::Ordered { .. }, ListKind::Ordered { .. })
    )
}

/// Split `input` into blocks in document order.
pub fn parse_blocks(input: &str) -> Vec<Block> {
    BlockScanner::new().scan(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_levels() {
        let blocks = parse_blocks("# one\n### three\n####### not a heading");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Heading { level: 1, .. }));
        assert!(matches!(&blocks[1], Block::Heading { level: 3, .. }));
        assert!(matches!(&blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn test_heading_requires_space() {
        let blocks = parse_blocks("#nospace");
        assert!(matches!(&blocks[0], Block::Paragraph { .. }));
    }

    #[test]
    fn test_paragraph_lazy_continuation() {
        let blocks = parse_blocks("one\ntwo\n\nthree");
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            Block::Paragraph {
                text: "one\ntwo".into(),
                source_line: 0
            }
        );
        assert_eq!(blocks[1].source_line(), 3);
    }

    #[test]
    fn test_fence_captures_everything() {
        let blocks = parse_blocks("```rust\n# not a heading\n- not a list\n```");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::CodeBlock {
                language, content, ..
            } => {
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(content, "# not a heading\n- not a list");
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_fence_still_emits() {
        let blocks = parse_blocks("```\ndangling");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::CodeBlock { .. }));
    }

    #[test]
    fn test_mermaid_fence() {
        let blocks = parse_blocks("```mermaid\ngraph TD\n```");
        assert!(matches!(&blocks[0], Block::Mermaid { code, .. } if code == "graph TD"));
    }

    #[test]
    fn test_table_requires_separator() {
        // No separator row: the pipe line is just a paragraph.
        let blocks = parse_blocks("| a | b |\nplain");
        assert!(matches!(&blocks[0], Block::Paragraph { .. }));

        let blocks = parse_blocks("| a | b |\n|---|:-:|\n| 1 | 2 |");
        match &blocks[0] {
            Block::Table {
                rows, alignments, ..
            } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0], vec!["a", "b"]);
                assert_eq!(alignments, &[Alignment::Left, Alignment::Center]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_table_alignments() {
        let blocks = parse_blocks("| a | b | c |\n|:--|--:|:-:|\n");
        match &blocks[0] {
            Block::Table { alignments, .. } => {
                assert_eq!(
                    alignments,
                    &[Alignment::Left, Alignment::Right, Alignment::Center]
                );
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_blockquote_nested_content() {
        let blocks = parse_blocks("> # quoted heading\n> body");
        match &blocks[0] {
            Block::Blockquote { blocks, .. } => {
                assert!(matches!(&blocks[0], Block::Heading { level: 1, .. }));
                assert!(matches!(&blocks[1], Block::Paragraph { .. }));
            }
            other => panic!("expected blockquote, got {other:?}"),
        }
    }

    #[test]
    fn test_list_kinds_do_not_merge() {
        let blocks = parse_blocks("- a\n- b\n1. one\n2. two");
        assert_eq!(blocks.len(), 2);
        assert!(
            matches!(&blocks[0], Block::List { kind: ListKind::Unordered, items, .. } if items.len() == 2)
        );
        assert!(
            matches!(&blocks[1], Block::List { kind: ListKind::Ordered { start: 1 }, items, .. } if items.len() == 2)
        );
    }

    #[test]
    fn test_ordered_list_keeps_declared_start() {
        let blocks = parse_blocks("7. seven\n9. nine");
        match &blocks[0] {
            Block::List { kind, items, .. } => {
                assert_eq!(*kind, ListKind::Ordered { start: 7 });
                // Declared numbers are preserved, not renumbered.
                assert_eq!(items[1].number, Some(9));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_task_list() {
        let blocks = parse_blocks("- [ ] todo\n- [x] done");
        match &blocks[0] {
            Block::List { kind, items, .. } => {
                assert_eq!(*kind, ListKind::Task);
                assert_eq!(items[0].checked, Some(false));
                assert_eq!(items[1].checked, Some(true));
            }
            other => panic!("expected task list, got {other:?}"),
        }
    }

    #[test]
    fn test_task_has_priority_over_bullet() {
        let blocks = parse_blocks("- [x] check");
        assert!(matches!(&blocks[0], Block::List { kind: ListKind::Task, .. }));
    }

    #[test]
    fn test_blank_line_ends_list() {
        let blocks = parse_blocks("- a\n\n- b");
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_horizontal_rule() {
        let blocks = parse_blocks("---\n***\n___");
        assert_eq!(blocks.len(), 3);
        assert!(blocks
            .iter()
            .all(|b| matches!(b, Block::HorizontalRule { .. })));
    }

    #[test]
    fn test_heading_flushes_open_list() {
        let blocks = parse_blocks("- item\n# head");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::List { .. }));
        assert!(matches!(&blocks[1], Block::Heading { .. }));
    }

    #[test]
    fn test_source_lines_cover_input() {
        let blocks = parse_blocks("# h\n\npara\n\n- li");
        let lines: Vec<usize> = blocks.iter().map(Block::source_line).collect();
        assert_eq!(lines, vec![0, 2, 4]);
    }

    #[test]
    fn test_blocks_serialize_with_tag() {
        let blocks = parse_blocks("- li\n\n```rust\nfn f() {}\n```");
        let json = serde_json::to_value(&blocks).unwrap();
        // The variant tag must not collide with the List's own `kind`
        // field; both appear side by side.
        assert_eq!(json[0]["block"], "list");
        assert_eq!(json[0]["kind"], "unordered");
        assert_eq!(json[1]["block"], "code_block");
        assert_eq!(json[1]["language"], "rust");
    }
}
