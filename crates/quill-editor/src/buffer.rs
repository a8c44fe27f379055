//! Text storage behind a small trait, so the undo wrapper and any
//! worker-thread parsing can stay generic over the backend.
//!
//! All offsets are in chars (Unicode scalar values), never bytes.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

/// A text buffer supporting char-offset editing.
pub trait TextBuffer {
    /// Length in chars.
    fn len_chars(&self) -> usize;

    /// Length in bytes (UTF-8).
    fn len_bytes(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert `text` at `char_offset`.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete the char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace the char range with `text`.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Slice as a SmolStr; `None` if the range is out of bounds.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Whole buffer as a String (this is what feeds the parser).
    fn contents(&self) -> String;

    fn char_to_byte(&self, char_offset: usize) -> usize;
    fn byte_to_char(&self, byte_offset: usize) -> usize;
}

/// Ropey-backed buffer: O(log n) edits anywhere in the document.
#[derive(Clone, Default)]
pub struct RopeBuffer {
    rope: ropey::Rope,
}

impl RopeBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(text),
        }
    }

    /// Line count as ropey sees it.
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Char offset of the start of `line` (for click-to-scroll sync).
    pub fn line_to_char(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        Some(self.rope.line_to_char(line))
    }
}

impl TextBuffer for RopeBuffer {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.end > self.rope.len_chars() || char_range.start > char_range.end {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn contents(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset)
    }
}

impl From<&str> for RopeBuffer {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_delete_replace() {
        let mut buf = RopeBuffer::new("hello world");
        buf.insert(5, ",");
        assert_eq!(buf.contents(), "hello, world");
        buf.delete(5..6);
        assert_eq!(buf.contents(), "hello world");
        buf.replace(6..11, "quill");
        assert_eq!(buf.contents(), "hello quill");
    }

    #[test]
    fn test_slice_bounds() {
        let buf = RopeBuffer::new("abc");
        assert_eq!(buf.slice(0..2).as_deref(), Some("ab"));
        assert_eq!(buf.slice(0..4), None);
    }

    #[test]
    fn test_char_byte_conversion() {
        // Multibyte char: 'é' is 2 bytes, 1 char.
        let buf = RopeBuffer::new("héllo");
        assert_eq!(buf.len_chars(), 5);
        assert_eq!(buf.len_bytes(), 6);
        assert_eq!(buf.char_to_byte(2), 3);
        assert_eq!(buf.byte_to_char(3), 2);
    }

    #[test]
    fn test_line_to_char() {
        let buf = RopeBuffer::new("one\ntwo\nthree");
        assert_eq!(buf.line_to_char(0), Some(0));
        assert_eq!(buf.line_to_char(1), Some(4));
        assert_eq!(buf.line_to_char(9), None);
    }
}
