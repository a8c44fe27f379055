//! Bounded undo/redo over a text buffer.
//!
//! `History<T>` wraps a buffer and records each mutation as an
//! invertible edit. The stacks are exclusively owned here; nothing else
//! mutates them.

use std::collections::VecDeque;
use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

use crate::buffer::TextBuffer;

/// Default number of undo steps kept.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// An invertible edit: applying it forward inserts `inserted` at `pos`
/// after removing `deleted`; applying it backward does the reverse.
#[derive(Clone, Debug)]
struct Edit {
    pos: usize,
    deleted: SmolStr,
    inserted: SmolStr,
}

/// A buffer wrapper providing bounded undo/redo.
#[derive(Clone)]
pub struct History<T> {
    buffer: T,
    undo: VecDeque<Edit>,
    redo: Vec<Edit>,
    depth: usize,
}

impl<T: TextBuffer + Default> Default for History<T> {
    fn default() -> Self {
        Self::new(T::default(), DEFAULT_UNDO_DEPTH)
    }
}

impl<T: TextBuffer> History<T> {
    pub fn new(buffer: T, depth: usize) -> Self {
        Self {
            buffer,
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth,
        }
    }

    /// Read access to the wrapped buffer.
    pub fn buffer(&self) -> &T {
        &self.buffer
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn record(&mut self, pos: usize, deleted: SmolStr, inserted: SmolStr) {
        // Any new edit invalidates the redo branch.
        self.redo.clear();
        self.undo.push_back(Edit {
            pos,
            deleted,
            inserted,
        });
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }

    /// Revert the most recent edit. Returns false when exhausted.
    pub fn undo(&mut self) -> bool {
        let Some(edit) = self.undo.pop_back() else {
            return false;
        };
        let inserted_chars = edit.inserted.chars().count();
        if inserted_chars > 0 {
            self.buffer.delete(edit.pos..edit.pos + inserted_chars);
        }
        if !edit.deleted.is_empty() {
            self.buffer.insert(edit.pos, &edit.deleted);
        }
        self.redo.push(edit);
        true
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self) -> bool {
        let Some(edit) = self.redo.pop() else {
            return false;
        };
        let deleted_chars = edit.deleted.chars().count();
        if deleted_chars > 0 {
            self.buffer.delete(edit.pos..edit.pos + deleted_chars);
        }
        if !edit.inserted.is_empty() {
            self.buffer.insert(edit.pos, &edit.inserted);
        }
        self.undo.push_back(edit);
        true
    }
}

// Mutations route through the wrapper so they are always recorded.
impl<T: TextBuffer> TextBuffer for History<T> {
    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn len_bytes(&self) -> usize {
        self.buffer.len_bytes()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.record(char_offset, SmolStr::default(), text.to_smolstr());
        self.buffer.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let deleted = self
            .buffer
            .slice(char_range.clone())
            .unwrap_or_default();
        self.record(char_range.start, deleted, SmolStr::default());
        self.buffer.delete(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(char_range)
    }

    fn contents(&self) -> String {
        self.buffer.contents()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.buffer.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.buffer.byte_to_char(byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RopeBuffer;

    fn hist(s: &str) -> History<RopeBuffer> {
        History::new(RopeBuffer::new(s), DEFAULT_UNDO_DEPTH)
    }

    #[test]
    fn test_undo_redo_insert() {
        let mut h = hist("hello");
        h.insert(5, " world");
        assert_eq!(h.contents(), "hello world");

        assert!(h.undo());
        assert_eq!(h.contents(), "hello");
        assert!(h.can_redo());

        assert!(h.redo());
        assert_eq!(h.contents(), "hello world");
        assert!(!h.can_redo());
    }

    #[test]
    fn test_undo_delete_restores_text() {
        let mut h = hist("hello world");
        h.delete(5..11);
        assert_eq!(h.contents(), "hello");
        assert!(h.undo());
        assert_eq!(h.contents(), "hello world");
    }

    #[test]
    fn test_replace_is_two_steps() {
        let mut h = hist("hello world");
        h.replace(6..11, "quill");
        assert_eq!(h.contents(), "hello quill");
        assert!(h.undo()); // undo the insert
        assert!(h.undo()); // undo the delete
        assert_eq!(h.contents(), "hello world");
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut h = hist("a");
        h.insert(1, "b");
        assert!(h.undo());
        assert!(h.can_redo());
        h.insert(1, "c");
        assert!(!h.can_redo());
    }

    #[test]
    fn test_depth_bound_evicts_oldest() {
        let mut h = History::new(RopeBuffer::new(""), 3);
        for (i, c) in ["a", "b", "c", "d"].iter().enumerate() {
            h.insert(i, c);
        }
        assert_eq!(h.contents(), "abcd");
        assert!(h.undo());
        assert!(h.undo());
        assert!(h.undo());
        assert!(!h.undo()); // first edit was evicted
        assert_eq!(h.contents(), "a");
    }

    #[test]
    fn test_multibyte_undo() {
        let mut h = hist("");
        h.insert(0, "héllo");
        assert!(h.undo());
        assert_eq!(h.contents(), "");
        assert!(h.redo());
        assert_eq!(h.contents(), "héllo");
    }
}
